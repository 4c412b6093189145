//! The control plane proper: one struct owning every piece of automation
//! state, driven entirely from the emulator thread through the frame tick
//! and the per-instruction, write, call, and CD-block callbacks.
//!
//! Both pause levels are sleep-and-poll loops inside those callbacks, so
//! commands received while paused execute against a quiescent machine and
//! may take any snapshot or mutate any mode without locks.

mod dispatch;
mod state;

use std::path::PathBuf;
use std::thread;

use saturnium_machine::{CdEvent, CpuId, Machine, WriteSource};
use tracing::{debug, info};

use crate::ack::AckWriter;
use crate::command::{self, ParseError};
use crate::config::AutomationConfig;
use crate::error::AutomationError;
use crate::input::InputInjector;
use crate::trace::TraceSet;
use crate::watcher::ActionWatcher;
use crate::watchpoint::WatchpointEngine;

pub use state::{FrameMode, StepState};
use state::Breakpoints;

pub struct Automation {
    cfg: AutomationConfig,
    active: bool,
    shutdown_done: bool,
    ack: AckWriter,
    watcher: ActionWatcher,
    frame_counter: u64,
    frame_mode: FrameMode,
    run_to_cycle: Option<u64>,
    step: StepState,
    breakpoints: Breakpoints,
    watch: WatchpointEngine,
    input: InputInjector,
    traces: TraceSet,
    pending_screenshot: Option<PathBuf>,
    pending_window_show: bool,
    pending_window_hide: bool,
    /// Mirror of the emulator-side per-instruction hook flag; written only
    /// by [`Automation::recompute_hook`].
    hook_enabled: bool,
    /// Reused buffer for watchpoint hit acks, keeping the storm path
    /// allocation-free.
    hit_scratch: String,
}

impl Automation {
    /// Engage the control plane: create the base directory, write the
    /// `ready` ack, and start paused at the first frame boundary.
    pub fn activate(cfg: AutomationConfig) -> Result<Self, AutomationError> {
        std::fs::create_dir_all(&cfg.base_dir).map_err(|source| {
            AutomationError::CreateBaseDir {
                path: cfg.base_dir.clone(),
                source,
            }
        })?;

        let ack_path = cfg.ack_path();
        let mut ack = AckWriter::new(ack_path.clone());
        ack.write_checked(0, "ready frame=0")
            .map_err(|source| AutomationError::WriteReady {
                path: ack_path,
                source,
            })?;

        let watcher = ActionWatcher::new(cfg.action_path());
        let watch = WatchpointEngine::new(cfg.watchpoint_log_path());

        info!(
            action = %cfg.action_path().display(),
            ack = %cfg.ack_path().display(),
            "automation initialized"
        );

        Ok(Self {
            cfg,
            active: true,
            shutdown_done: false,
            ack,
            watcher,
            frame_counter: 0,
            frame_mode: FrameMode::Paused,
            run_to_cycle: None,
            step: StepState::Disarmed,
            breakpoints: Breakpoints::default(),
            watch,
            input: InputInjector::default(),
            traces: TraceSet::new(),
            pending_screenshot: None,
            pending_window_show: false,
            pending_window_hide: false,
            hook_enabled: false,
            hit_scratch: String::with_capacity(128),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// While active, the host suppresses window raise/focus grabbing.
    pub fn suppress_raise(&self) -> bool {
        self.active
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn hook_enabled(&self) -> bool {
        self.hook_enabled
    }

    /// Consume a pending `show_window` request.
    pub fn take_pending_window_show(&mut self) -> bool {
        std::mem::take(&mut self.pending_window_show)
    }

    /// Consume a pending `hide_window` request.
    pub fn take_pending_window_hide(&mut self) -> bool {
        std::mem::take(&mut self.pending_window_hide)
    }

    /// Startup gate: hold the emulator at the frame-0 boundary while the
    /// initial paused state (or any later pause) is in effect. The host
    /// calls this once between activation and its first emulated frame, so
    /// no frame slips before the orchestrator's first command.
    pub fn wait_while_paused(&mut self, emu: &mut dyn Machine) {
        if !self.active {
            return;
        }
        self.poll(emu);
        while self.frame_mode == FrameMode::Paused && self.active {
            thread::sleep(self.cfg.poll_interval);
            self.poll(emu);
        }
    }

    /// Frame boundary tick. Called once after each completed frame; when
    /// the tick leaves the frame mode paused, this call does not return
    /// until a command unblocks it (or the plane shuts down), so paused
    /// periods suppress further ticks entirely.
    pub fn frame_tick(&mut self, emu: &mut dyn Machine) {
        if !self.active {
            return;
        }
        self.frame_counter += 1;

        if self.pending_screenshot.is_some() {
            self.take_screenshot(emu);
        }

        if let Some(target) = self.run_to_cycle
            && emu.master_cycle() >= target
        {
            self.run_to_cycle = None;
            self.frame_mode = FrameMode::Paused;
            let msg = format!(
                "done run_to_cycle cycle={} frame={}",
                emu.master_cycle(),
                self.frame_counter
            );
            self.emit(emu, &msg);
        }

        if let FrameMode::RunToFrame { target } = self.frame_mode
            && self.frame_counter >= target
        {
            self.frame_mode = FrameMode::Paused;
            let msg = format!("done run_to_frame frame={}", self.frame_counter);
            self.emit(emu, &msg);
        }

        if let FrameMode::Advance { remaining, pc_trace } = self.frame_mode {
            if remaining <= 1 {
                self.frame_mode = FrameMode::Paused;
                if pc_trace {
                    let msg = match self.traces.finish_pc() {
                        Ok(()) => format!("done pc_trace_frame frame={}", self.frame_counter),
                        Err(e) => format!("error pc_trace_frame: {e}"),
                    };
                    self.recompute_hook(emu);
                    self.emit(emu, &msg);
                } else {
                    let msg = format!("done frame_advance frame={}", self.frame_counter);
                    self.emit(emu, &msg);
                }
            } else {
                self.frame_mode = FrameMode::Advance {
                    remaining: remaining - 1,
                    pc_trace,
                };
            }
        }

        self.wait_while_paused(emu);
    }

    /// Per-instruction callback, invoked by the CPU loop only while the hook
    /// is armed. `pc` is the decode PC of the retiring instruction.
    pub fn on_instruction(&mut self, emu: &mut dyn Machine, pc: u32) {
        if !self.active {
            return;
        }

        self.traces.record_pc(pc);

        if self.traces.insn_window_armed() {
            // SH-2 opcodes are big-endian 16-bit; fetch through the
            // cache-aware accessor.
            let opcode =
                ((emu.read_mem8(pc) as u16) << 8) | emu.read_mem8(pc.wrapping_add(1)) as u16;
            if self.traces.on_insn(emu.master_cycle(), CpuId::Master, pc, opcode) {
                self.recompute_hook(emu);
            }
        }

        let bp_hit = self.breakpoints.hit(pc);
        let mut step_done = false;
        if let StepState::CountingDown { remaining } = self.step {
            if remaining <= 1 {
                step_done = true;
            } else {
                self.step = StepState::CountingDown {
                    remaining: remaining - 1,
                };
            }
        }
        if !bp_hit && !step_done {
            return;
        }

        self.step = StepState::Paused;
        let cycle = emu.master_cycle();
        let frame = self.frame_counter;
        if step_done {
            // Step completion reports the fetch PC: the instruction about to
            // execute. Breakpoints report the decode PC, which is by
            // construction the matched address.
            let fetch_pc = emu.master_pc();
            let msg = format!("done step pc=0x{fetch_pc:08x} frame={frame}");
            self.ack.write(cycle, &msg);
        } else {
            let msg = format!("break pc=0x{pc:08x} addr=0x{pc:08x} frame={frame}");
            self.ack.write(cycle, &msg);
        }

        while self.step == StepState::Paused && self.active {
            thread::sleep(self.cfg.poll_interval);
            self.poll(emu);
        }
    }

    /// Subroutine-call event (JSR/BSR/BSRF class) from either CPU. `caller`
    /// is the return-slot PC latched by the CPU.
    pub fn on_subroutine_call(&mut self, emu: &dyn Machine, cpu: CpuId, caller: u32, target: u32) {
        if !self.active {
            return;
        }
        self.traces.on_call(emu.master_cycle(), cpu, caller, target);
    }

    /// 4-byte write observation. Both the CPU store path and the SCU-DMA
    /// engine forward here; detection never blocks the emulator.
    #[allow(clippy::too_many_arguments)]
    pub fn on_write(
        &mut self,
        emu: &dyn Machine,
        source: WriteSource,
        pc: u32,
        pr: u32,
        addr: u32,
        old: u32,
        new: u32,
    ) {
        if !self.active {
            return;
        }
        if self.watch.on_write(pc, pr, addr, old, new, self.frame_counter) {
            use std::fmt::Write as _;
            // The hit ack omits `addr=`; the log line carries it.
            self.hit_scratch.clear();
            let _ = write!(
                self.hit_scratch,
                "hit watchpoint pc=0x{pc:08x} pr=0x{pr:08x} old=0x{old:08x} new=0x{new:08x} frame={}",
                self.frame_counter
            );
            let cycle = emu.master_cycle();
            self.ack.write(cycle, &self.hit_scratch);
            debug!(?source, addr = format_args!("{addr:08x}"), "watchpoint hit");
        }
    }

    /// CD-block event callback.
    pub fn on_cd_event(&mut self, emu: &dyn Machine, event: CdEvent<'_>) {
        if !self.active {
            return;
        }
        self.traces.on_cd(emu.master_cycle(), event);
    }

    /// Input request for an emulated controller port; ORs the automation
    /// mask into port 0. Returns whether anything was injected.
    pub fn port_input(&mut self, port: usize, data: &mut [u8]) -> bool {
        if !self.active {
            return false;
        }
        self.input.apply(port, data)
    }

    /// Record a host system command (save state, host screenshot, ...) into
    /// the input trace.
    pub fn log_system_command(&mut self, name: &str) {
        if !self.active {
            return;
        }
        let frame = self.frame_counter;
        self.traces.log_input(format_args!("system {name} frame={frame}"));
    }

    /// Tear down: close every recorder and emit the shutdown ack exactly
    /// once. The host calls this after `quit` unwinds its main loop, and
    /// again harmlessly from its generic teardown path.
    pub fn shutdown(&mut self, emu: &dyn Machine) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;
        self.traces.close_all();
        self.watch.close();
        let msg = format!("shutdown frame={}", self.frame_counter);
        let cycle = emu.master_cycle();
        self.ack.write(cycle, &msg);
        self.active = false;
        info!("automation shut down");
    }

    fn take_screenshot(&mut self, emu: &mut dyn Machine) {
        let Some(path) = self.pending_screenshot.take() else {
            return;
        };
        let cycle = emu.master_cycle();
        let outcome = match emu.framebuffer() {
            Some(view) => Some((self.cfg.encoder)(&view, &path)),
            None => None,
        };
        match outcome {
            Some(Ok(())) => {
                let msg = format!("ok screenshot {}", path.display());
                self.ack.write(cycle, &msg);
            }
            Some(Err(e)) => {
                let msg = format!("error screenshot: {e}");
                self.ack.write(cycle, &msg);
            }
            // No framebuffer composited this frame; keep the request queued.
            None => self.pending_screenshot = Some(path),
        }
    }

    /// One poll round: surface queued recorder failures, then read the
    /// action file and dispatch a freshly-headered batch.
    fn poll(&mut self, emu: &mut dyn Machine) {
        let failures = self.traces.drain_errors();
        if !failures.is_empty() {
            for (name, reason) in failures {
                let msg = format!("error {name}: {reason}");
                self.emit(emu, &msg);
            }
            self.recompute_hook(emu);
        }
        if let Some(reason) = self.watch.take_failure() {
            let msg = format!("error watchpoint: {reason}");
            self.emit(emu, &msg);
        }

        let Some(lines) = self.watcher.poll() else {
            return;
        };
        for line in lines {
            self.process_line(emu, &line);
        }
    }

    fn process_line(&mut self, emu: &mut dyn Machine, line: &str) {
        match command::parse(line) {
            Ok(cmd) => {
                debug!(?cmd, "dispatch");
                self.execute(emu, cmd);
            }
            Err(ParseError::Unknown { word }) => {
                let msg = format!("error unknown command: {word}");
                self.emit(emu, &msg);
            }
            Err(ParseError::Invalid { cmd, reason }) => {
                let msg = format!("error {cmd}: {reason}");
                self.emit(emu, &msg);
            }
        }
    }

    /// The per-instruction hook is armed exactly when something needs it:
    /// stepping, breakpoints, or a per-instruction trace. Watchpoints never
    /// arm it. Sole writer of the emulator-side flag.
    fn recompute_hook(&mut self, emu: &mut dyn Machine) {
        let want = !matches!(self.step, StepState::Disarmed)
            || !self.breakpoints.is_empty()
            || self.traces.insn_hook_needed();
        if want != self.hook_enabled {
            self.hook_enabled = want;
            emu.set_cpu_hook(want);
            debug!(enabled = want, "cpu hook");
        }
    }

    fn emit(&mut self, emu: &dyn Machine, msg: &str) {
        let cycle = emu.master_cycle();
        self.ack.write(cycle, msg);
    }
}
