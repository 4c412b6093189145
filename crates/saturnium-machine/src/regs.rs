use std::fmt::Write as _;

/// Number of bytes in the binary register snapshot: 22 little-endian `u32`
/// values in the order R0..R15, PC, SR, PR, GBR, VBR, MACH. MACL is not part
/// of the binary layout; consumers index the file by these fixed offsets.
pub const REGS_BIN_LEN: usize = 22 * 4;

/// One SH-2 register bank, captured at a quiescent point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuRegs {
    pub r: [u32; 16],
    pub pc: u32,
    pub sr: u32,
    pub pr: u32,
    pub gbr: u32,
    pub vbr: u32,
    pub mach: u32,
    pub macl: u32,
}

impl CpuRegs {
    /// Text dump of all 23 values, one per line, preceded by a `regs <label>`
    /// header line. No trailing newline; the ack writer appends its suffix.
    pub fn text_block(&self, label: &str) -> String {
        let mut out = String::with_capacity(24 * 16);
        let _ = write!(out, "regs {label}");
        for (i, v) in self.r.iter().enumerate() {
            let _ = write!(out, "\nR{i}=0x{v:08x}");
        }
        let _ = write!(out, "\nPC=0x{:08x}", self.pc);
        let _ = write!(out, "\nSR=0x{:08x}", self.sr);
        let _ = write!(out, "\nPR=0x{:08x}", self.pr);
        let _ = write!(out, "\nGBR=0x{:08x}", self.gbr);
        let _ = write!(out, "\nVBR=0x{:08x}", self.vbr);
        let _ = write!(out, "\nMACH=0x{:08x}", self.mach);
        let _ = write!(out, "\nMACL=0x{:08x}", self.macl);
        out
    }

    /// Binary snapshot: R0..R15, PC, SR, PR, GBR, VBR, MACH as little-endian
    /// `u32`s. 88 bytes, no header, no padding, MACL absent.
    pub fn to_bytes(&self) -> [u8; REGS_BIN_LEN] {
        let mut out = [0u8; REGS_BIN_LEN];
        let words = self
            .r
            .iter()
            .copied()
            .chain([self.pc, self.sr, self.pr, self.gbr, self.vbr, self.mach]);
        for (i, w) in words.enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        out
    }
}
