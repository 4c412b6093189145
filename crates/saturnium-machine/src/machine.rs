use crate::regs::CpuRegs;

/// Borrowed view of the composited framebuffer handed to the screenshot
/// encoder. Pixel format is whatever the emulator composites; the control
/// plane never interprets it.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u32],
}

/// Read-only accessors and arming points the emulator exposes to the control
/// plane. All methods are called from the emulator thread only.
pub trait Machine {
    /// Master SH-2 register bank.
    fn master_regs(&self) -> CpuRegs;

    /// Slave SH-2 register bank.
    fn slave_regs(&self) -> CpuRegs;

    /// Cache-aware byte read: probes the SH-2 instruction cache (tag match
    /// across the four ways) before falling back to backing RAM. Code loaded
    /// from the optical medium may exist only in cache.
    fn read_mem8(&self, addr: u32) -> u8;

    /// Fetch PC of the master CPU: the address the fetch unit is reading,
    /// ahead of the decode PC by the pipeline depth (2 or 4 bytes).
    fn master_pc(&self) -> u32;

    /// Master CPU monotonic cycle counter.
    fn master_cycle(&self) -> u64;

    /// Opaque binary snapshot of the VDP2 register file.
    fn vdp2_regs(&self) -> Vec<u8>;

    /// Current framebuffer, if one has been composited this frame.
    fn framebuffer(&self) -> Option<FrameView<'_>>;

    /// Arm or disarm the per-instruction callback. While disarmed the CPU
    /// loop checks a single flag per instruction and never calls into the
    /// control plane.
    fn set_cpu_hook(&mut self, enabled: bool);

    /// Install a fixed PRNG seed for reproducible runs.
    fn set_deterministic(&mut self);

    /// Ask the host main loop to shut down cleanly.
    fn request_exit(&mut self);
}
