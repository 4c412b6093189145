//! Scriptable [`Machine`] stand-in for control-plane tests.

use crate::machine::{FrameView, Machine};
use crate::regs::CpuRegs;

const RAM_LEN: usize = 0x10_0000;
const RAM_MASK: u32 = (RAM_LEN as u32) - 1;

/// Fixed fetch-ahead distance reported by [`Machine::master_pc`]. Real
/// hardware sits 2 or 4 bytes ahead of decode depending on pipeline state.
pub const MOCK_PIPELINE_DEPTH: u32 = 4;

/// A flat-RAM Saturn with a hand-cranked instruction stream. Tests drive the
/// control plane's callbacks against it: set the decode PC with
/// [`MockSaturn::begin_instruction`], then invoke the hook themselves.
pub struct MockSaturn {
    ram: Vec<u8>,
    regs_master: CpuRegs,
    regs_slave: CpuRegs,
    cycle: u64,
    hook_enabled: bool,
    deterministic: bool,
    exit_requested: bool,
    fb_width: u32,
    fb_height: u32,
    fb: Vec<u32>,
    vdp2: Vec<u8>,
}

impl MockSaturn {
    pub fn new() -> Self {
        Self {
            ram: vec![0; RAM_LEN],
            regs_master: CpuRegs::default(),
            regs_slave: CpuRegs::default(),
            cycle: 0,
            hook_enabled: false,
            deterministic: false,
            exit_requested: false,
            fb_width: 0,
            fb_height: 0,
            fb: Vec::new(),
            vdp2: vec![0; 0x200],
        }
    }

    fn index(addr: u32) -> usize {
        (addr & RAM_MASK) as usize
    }

    pub fn poke(&mut self, addr: u32, byte: u8) {
        self.ram[Self::index(addr)] = byte;
    }

    pub fn fill(&mut self, addr: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.poke(addr.wrapping_add(i as u32), *b);
        }
    }

    pub fn set_framebuffer(&mut self, width: u32, height: u32, pixels: Vec<u32>) {
        self.fb_width = width;
        self.fb_height = height;
        self.fb = pixels;
    }

    pub fn set_master_regs(&mut self, regs: CpuRegs) {
        self.regs_master = regs;
    }

    pub fn set_slave_regs(&mut self, regs: CpuRegs) {
        self.regs_slave = regs;
    }

    pub fn set_vdp2_regs(&mut self, bytes: Vec<u8>) {
        self.vdp2 = bytes;
    }

    /// Advance the machine to the next decode slot: latches the decode PC
    /// and burns a couple of cycles.
    pub fn begin_instruction(&mut self, pc: u32) {
        self.regs_master.pc = pc;
        self.cycle += 2;
    }

    pub fn advance_cycles(&mut self, n: u64) {
        self.cycle += n;
    }

    pub fn hook_enabled(&self) -> bool {
        self.hook_enabled
    }

    pub fn deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

impl Default for MockSaturn {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for MockSaturn {
    fn master_regs(&self) -> CpuRegs {
        self.regs_master
    }

    fn slave_regs(&self) -> CpuRegs {
        self.regs_slave
    }

    fn read_mem8(&self, addr: u32) -> u8 {
        self.ram[Self::index(addr)]
    }

    fn master_pc(&self) -> u32 {
        self.regs_master.pc.wrapping_add(MOCK_PIPELINE_DEPTH)
    }

    fn master_cycle(&self) -> u64 {
        self.cycle
    }

    fn vdp2_regs(&self) -> Vec<u8> {
        self.vdp2.clone()
    }

    fn framebuffer(&self) -> Option<FrameView<'_>> {
        if self.fb.is_empty() {
            return None;
        }
        Some(FrameView {
            width: self.fb_width,
            height: self.fb_height,
            pixels: &self.fb,
        })
    }

    fn set_cpu_hook(&mut self, enabled: bool) {
        self.hook_enabled = enabled;
    }

    fn set_deterministic(&mut self) {
        self.deterministic = true;
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }
}
