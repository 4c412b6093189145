//! Register, memory, and VDP2 snapshot emission.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

use saturnium_machine::{CpuRegs, Machine};

/// Text memory dumps clamp to 64 KiB; the clamp is silent.
pub const DUMP_MEM_MAX: u32 = 0x1_0000;
/// Binary memory dumps clamp to 1 MiB.
pub const DUMP_MEM_BIN_MAX: u32 = 0x10_0000;

/// Textual hex dump, 16 bytes per row, `mem <addr>` header. Bytes are read
/// through the cache-aware accessor so code that only exists in the
/// instruction cache still dumps correctly.
pub fn hex_dump(emu: &dyn Machine, addr: u32, size: u32) -> String {
    let size = size.min(DUMP_MEM_MAX);
    let mut out = String::with_capacity(8 + size as usize * 3 + size as usize / 16 + 16);
    let _ = write!(out, "mem {addr:08X}");
    for i in 0..size {
        if i % 16 == 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:02X} ", emu.read_mem8(addr.wrapping_add(i)));
    }
    out
}

/// 22 little-endian words, MACL absent. 88 bytes on disk.
pub fn write_regs_bin(path: &Path, regs: &CpuRegs) -> io::Result<()> {
    std::fs::write(path, regs.to_bytes())
}

/// Raw memory image via the cache-aware accessor. Returns the clamped size
/// actually written.
pub fn write_mem_bin(emu: &dyn Machine, addr: u32, size: u32, path: &Path) -> io::Result<u32> {
    let size = size.min(DUMP_MEM_BIN_MAX);
    let mut w = BufWriter::new(File::create(path)?);
    for i in 0..size {
        w.write_all(&[emu.read_mem8(addr.wrapping_add(i))])?;
    }
    w.flush()?;
    Ok(size)
}

pub fn write_vdp2_regs(emu: &dyn Machine, path: &Path) -> io::Result<()> {
    std::fs::write(path, emu.vdp2_regs())
}
