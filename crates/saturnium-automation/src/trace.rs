//! Trace recorders. Each recorder is independently armed (opening its file)
//! and disarmed (closing it); on shutdown every open file closes. Low-rate
//! traces write straight through an unbuffered `File` so a crashing emulator
//! still leaves a diagnosable log; the per-frame PC trace is buffered.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

use saturnium_machine::{CdEvent, CpuId};
use tracing::warn;

/// Flush-on-write text sink: one line per event, one `write` syscall each.
struct LineTrace {
    file: File,
}

impl LineTrace {
    fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    fn write_line(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.file.write_fmt(args)?;
        self.file.write_all(b"\n")
    }
}

/// Raw little-endian `u32` stream of decode PCs for exactly one frame.
pub(crate) struct PcTrace {
    w: BufWriter<File>,
}

impl PcTrace {
    fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            w: BufWriter::new(File::create(path)?),
        })
    }

    #[inline]
    fn record(&mut self, pc: u32) -> io::Result<()> {
        self.w.write_all(&pc.to_le_bytes())
    }

    fn finish(mut self) -> io::Result<()> {
        self.w.flush()
    }
}

/// Where instruction-window lines go.
enum InsnSink {
    Off,
    File(LineTrace),
    Unified,
}

/// `[start_line, stop_line]` window over a line counter shared by the
/// file-mode and unified-mode variants. Lines are 1-based from arming.
struct InsnWindow {
    sink: InsnSink,
    start_line: u64,
    stop_line: u64,
    line: u64,
}

impl InsnWindow {
    fn disarmed() -> Self {
        Self {
            sink: InsnSink::Off,
            start_line: 0,
            stop_line: 0,
            line: 0,
        }
    }

    fn armed(&self) -> bool {
        !matches!(self.sink, InsnSink::Off)
    }
}

/// The full recorder set, owned by the control plane.
pub(crate) struct TraceSet {
    pc: Option<PcTrace>,
    call: Option<LineTrace>,
    unified: Option<LineTrace>,
    scdq: Option<LineTrace>,
    cdb: Option<LineTrace>,
    input: Option<LineTrace>,
    insn: InsnWindow,
    /// Recorder failures waiting to surface as `error <trace>: <reason>`
    /// acks at the next poll.
    errors: Vec<(&'static str, String)>,
}

fn write_or_disarm(
    slot: &mut Option<LineTrace>,
    name: &'static str,
    errors: &mut Vec<(&'static str, String)>,
    args: fmt::Arguments<'_>,
) {
    if let Some(trace) = slot.as_mut()
        && let Err(e) = trace.write_line(args)
    {
        warn!(trace = name, error = %e, "trace write failed, disarming");
        errors.push((name, e.to_string()));
        *slot = None;
    }
}

impl TraceSet {
    pub fn new() -> Self {
        Self {
            pc: None,
            call: None,
            unified: None,
            scdq: None,
            cdb: None,
            input: None,
            insn: InsnWindow::disarmed(),
            errors: Vec::new(),
        }
    }

    /// True when any per-instruction recorder is armed; only these (plus
    /// stepping and breakpoints) justify the CPU hook.
    pub fn insn_hook_needed(&self) -> bool {
        self.pc.is_some() || self.insn.armed()
    }

    pub fn insn_window_armed(&self) -> bool {
        self.insn.armed()
    }

    pub fn drain_errors(&mut self) -> Vec<(&'static str, String)> {
        std::mem::take(&mut self.errors)
    }

    // --- arming / disarming ---------------------------------------------

    pub fn arm_pc(&mut self, path: &Path) -> io::Result<()> {
        self.pc = Some(PcTrace::create(path)?);
        Ok(())
    }

    /// Flush and close the per-frame PC trace at the frame boundary.
    pub fn finish_pc(&mut self) -> io::Result<()> {
        match self.pc.take() {
            Some(t) => t.finish(),
            None => Ok(()),
        }
    }

    pub fn arm_call(&mut self, path: &Path) -> io::Result<()> {
        self.call = Some(LineTrace::create(path)?);
        Ok(())
    }

    pub fn close_call(&mut self) {
        self.call = None;
    }

    pub fn arm_unified(&mut self, path: &Path) -> io::Result<()> {
        self.unified = Some(LineTrace::create(path)?);
        Ok(())
    }

    /// Closing the unified stream also disarms an instruction window that
    /// was feeding it; returns true when that happened (hook recompute due).
    pub fn close_unified(&mut self) -> bool {
        self.unified = None;
        if matches!(self.insn.sink, InsnSink::Unified) {
            self.insn = InsnWindow::disarmed();
            return true;
        }
        false
    }

    pub fn arm_insn_file(&mut self, path: &Path, start_line: u64, stop_line: u64) -> io::Result<()> {
        let sink = InsnSink::File(LineTrace::create(path)?);
        self.insn = InsnWindow {
            sink,
            start_line,
            stop_line,
            line: 0,
        };
        Ok(())
    }

    /// Window over the already-armed unified stream.
    pub fn arm_insn_unified(&mut self, start_line: u64, stop_line: u64) -> Result<(), &'static str> {
        if self.unified.is_none() {
            return Err("unified trace not armed");
        }
        self.insn = InsnWindow {
            sink: InsnSink::Unified,
            start_line,
            stop_line,
            line: 0,
        };
        Ok(())
    }

    pub fn disarm_insn(&mut self) {
        self.insn = InsnWindow::disarmed();
    }

    pub fn arm_scdq(&mut self, path: &Path) -> io::Result<()> {
        self.scdq = Some(LineTrace::create(path)?);
        Ok(())
    }

    pub fn close_scdq(&mut self) {
        self.scdq = None;
    }

    pub fn arm_cdb(&mut self, path: &Path) -> io::Result<()> {
        self.cdb = Some(LineTrace::create(path)?);
        Ok(())
    }

    pub fn close_cdb(&mut self) {
        self.cdb = None;
    }

    pub fn arm_input(&mut self, path: &Path) -> io::Result<()> {
        self.input = Some(LineTrace::create(path)?);
        Ok(())
    }

    pub fn close_input(&mut self) {
        self.input = None;
    }

    /// Drop every open recorder (quit / process shutdown).
    pub fn close_all(&mut self) {
        if let Some(t) = self.pc.take()
            && let Err(e) = t.finish()
        {
            warn!(error = %e, "pc trace flush failed on shutdown");
        }
        self.call = None;
        self.unified = None;
        self.scdq = None;
        self.cdb = None;
        self.input = None;
        self.insn = InsnWindow::disarmed();
    }

    // --- event paths ----------------------------------------------------

    /// Record a decode PC into the per-frame trace.
    #[inline]
    pub fn record_pc(&mut self, pc: u32) {
        if let Some(t) = self.pc.as_mut()
            && let Err(e) = t.record(pc)
        {
            warn!(error = %e, "pc trace write failed, disarming");
            self.errors.push(("pc_trace_frame", e.to_string()));
            self.pc = None;
        }
    }

    /// One instruction through the window. Returns true when the window
    /// disarmed itself (end of window or write failure) and the hook state
    /// must be recomputed.
    pub fn on_insn(&mut self, cycle: u64, cpu: CpuId, pc: u32, opcode: u16) -> bool {
        if !self.insn.armed() {
            return false;
        }
        self.insn.line += 1;
        let line = self.insn.line;
        if line >= self.insn.start_line && line <= self.insn.stop_line {
            let tag = cpu.insn_tag();
            match &mut self.insn.sink {
                InsnSink::File(trace) => {
                    if let Err(e) =
                        trace.write_line(format_args!("{cycle} {tag} {pc:08X} {opcode:04X}"))
                    {
                        warn!(error = %e, "insn trace write failed, disarming");
                        self.errors.push(("insn_trace", e.to_string()));
                        self.insn = InsnWindow::disarmed();
                        return true;
                    }
                }
                InsnSink::Unified => {
                    write_or_disarm(
                        &mut self.unified,
                        "unified_trace",
                        &mut self.errors,
                        format_args!("{cycle} {tag} {pc:08X} {opcode:04X}"),
                    );
                    if self.unified.is_none() {
                        self.insn = InsnWindow::disarmed();
                        return true;
                    }
                }
                InsnSink::Off => unreachable!(),
            }
        }
        if line >= self.insn.stop_line {
            self.insn = InsnWindow::disarmed();
            return true;
        }
        false
    }

    /// Subroutine-call event (JSR/BSR/BSRF class). The callback hands over
    /// the return-slot PC; the file records it minus 4.
    pub fn on_call(&mut self, cycle: u64, cpu: CpuId, caller: u32, target: u32) {
        let from = caller.wrapping_sub(4);
        let tag = cpu.call_tag();
        write_or_disarm(
            &mut self.call,
            "call_trace",
            &mut self.errors,
            format_args!("{cycle} {tag} {from:08X} {target:08X}"),
        );
        write_or_disarm(
            &mut self.unified,
            "unified_trace",
            &mut self.errors,
            format_args!("{cycle} {tag} {from:08X} {target:08X}"),
        );
    }

    /// CD-block event. SCDQ deliveries go to the SCDQ trace only; the
    /// CMD/DRV/IRQ/BUF classes go to the CDB trace and the unified stream.
    pub fn on_cd(&mut self, cycle: u64, event: CdEvent<'_>) {
        match event {
            CdEvent::Scdq { payload } => {
                write_or_disarm(
                    &mut self.scdq,
                    "scdq_trace",
                    &mut self.errors,
                    format_args!("{cycle} SCDQ {payload}"),
                );
            }
            CdEvent::Cdb { class, payload } => {
                let tag = class.tag();
                write_or_disarm(
                    &mut self.cdb,
                    "cdb_trace",
                    &mut self.errors,
                    format_args!("{cycle} {tag} {payload}"),
                );
                write_or_disarm(
                    &mut self.unified,
                    "unified_trace",
                    &mut self.errors,
                    format_args!("{cycle} {tag} {payload}"),
                );
            }
        }
    }

    /// Input-injector / system-command event, one line with the frame
    /// number.
    pub fn log_input(&mut self, args: fmt::Arguments<'_>) {
        write_or_disarm(&mut self.input, "input_trace", &mut self.errors, args);
    }
}
