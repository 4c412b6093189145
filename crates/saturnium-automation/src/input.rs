use saturnium_machine::Button;

/// Case-insensitive protocol-name lookup.
pub fn parse_button(name: &str) -> Option<Button> {
    let upper = name.to_ascii_uppercase();
    Some(match upper.as_str() {
        "START" => Button::Start,
        "A" => Button::A,
        "B" => Button::B,
        "C" => Button::C,
        "X" => Button::X,
        "Y" => Button::Y,
        "Z" => Button::Z,
        "L" => Button::L,
        "R" => Button::R,
        "UP" => Button::Up,
        "DOWN" => Button::Down,
        "LEFT" => Button::Left,
        "RIGHT" => Button::Right,
        _ => return None,
    })
}

/// Additive input injection for emulated controller port 0. The pressed
/// mask is OR-ed into whatever the host input layer already produced; other
/// ports pass through untouched.
#[derive(Debug, Default)]
pub struct InputInjector {
    mask: u16,
}

impl InputInjector {
    pub fn press(&mut self, button: Button) {
        self.mask |= button.mask();
    }

    pub fn release(&mut self, button: Button) {
        self.mask &= !button.mask();
    }

    pub fn clear(&mut self) {
        self.mask = 0;
    }

    pub fn mask(&self) -> u16 {
        self.mask
    }

    /// True while at least one automation-pressed button is held.
    pub fn override_active(&self) -> bool {
        self.mask != 0
    }

    /// OR the pressed bitmap into the port's two-byte input word. Returns
    /// whether anything was injected.
    pub fn apply(&self, port: usize, data: &mut [u8]) -> bool {
        if port != 0 || !self.override_active() || data.len() < 2 {
            return false;
        }
        data[0] |= (self.mask & 0xff) as u8;
        data[1] |= (self.mask >> 8) as u8;
        true
    }
}
