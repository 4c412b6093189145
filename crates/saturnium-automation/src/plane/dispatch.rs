//! Command execution: one ack per command (two for the deferred-completion
//! commands, whose `done` acks come from the frame scheduler or the
//! instruction hook).

use std::fmt::Write as _;

use saturnium_machine::Machine;
use tracing::info;

use super::state::{FrameMode, StepState};
use super::Automation;
use crate::command::Command;
use crate::input::parse_button;
use crate::snapshot;

impl Automation {
    /// A command that retargets the frame mode abandons a still-pending
    /// one-frame PC trace; the recorder closes with whatever it captured.
    fn cancel_pc_trace_advance(&mut self) {
        if let FrameMode::Advance { pc_trace: true, .. } = self.frame_mode
            && let Err(e) = self.traces.finish_pc()
        {
            tracing::warn!(error = %e, "abandoned pc trace flush failed");
        }
    }

    pub(super) fn execute(&mut self, emu: &mut dyn Machine, cmd: Command) {
        match cmd {
            Command::FrameAdvance { frames } => {
                // A frame-unblocking command cancels any pending step.
                self.step = StepState::Disarmed;
                self.run_to_cycle = None;
                self.cancel_pc_trace_advance();
                self.recompute_hook(emu);
                self.frame_mode = FrameMode::Advance {
                    remaining: frames,
                    pc_trace: false,
                };
                let msg = format!("ok frame_advance {frames}");
                self.emit(emu, &msg);
            }
            Command::RunToFrame { target } => {
                self.step = StepState::Disarmed;
                self.run_to_cycle = None;
                self.cancel_pc_trace_advance();
                self.recompute_hook(emu);
                self.frame_mode = FrameMode::RunToFrame { target };
                let msg = format!("ok run_to_frame {target}");
                self.emit(emu, &msg);
            }
            Command::Run => {
                self.cancel_pc_trace_advance();
                self.recompute_hook(emu);
                self.frame_mode = FrameMode::Free;
                self.run_to_cycle = None;
                self.emit(emu, "ok run");
            }
            Command::Pause => {
                self.cancel_pc_trace_advance();
                self.recompute_hook(emu);
                self.frame_mode = FrameMode::Paused;
                let msg = format!("ok pause frame={}", self.frame_counter);
                self.emit(emu, &msg);
            }
            Command::Quit => {
                self.emit(emu, "ok quit");
                // Release both pause levels so the host loop can unwind;
                // the shutdown ack follows from `shutdown()`.
                self.frame_mode = FrameMode::Free;
                self.run_to_cycle = None;
                self.step = StepState::Disarmed;
                self.recompute_hook(emu);
                emu.request_exit();
                info!("quit requested");
            }
            Command::Status => {
                let msg = format!(
                    "status frame={} paused={} inst_paused={} breakpoints={} input=0x{:x}",
                    self.frame_counter,
                    self.frame_mode == FrameMode::Paused,
                    self.step == StepState::Paused,
                    self.breakpoints.len(),
                    self.input.mask()
                );
                self.emit(emu, &msg);
            }
            Command::Input { name } => match parse_button(&name) {
                Some(button) => {
                    self.input.press(button);
                    let frame = self.frame_counter;
                    self.traces
                        .log_input(format_args!("input {name} frame={frame}"));
                    let msg = format!("ok input {name}");
                    self.emit(emu, &msg);
                }
                None => {
                    let msg = format!("error input: unknown button {name}");
                    self.emit(emu, &msg);
                }
            },
            Command::InputRelease { name } => match parse_button(&name) {
                Some(button) => {
                    self.input.release(button);
                    let frame = self.frame_counter;
                    self.traces
                        .log_input(format_args!("input_release {name} frame={frame}"));
                    let msg = format!("ok input_release {name}");
                    self.emit(emu, &msg);
                }
                None => {
                    let msg = format!("error input_release: unknown button {name}");
                    self.emit(emu, &msg);
                }
            },
            Command::InputClear => {
                self.input.clear();
                let frame = self.frame_counter;
                self.traces
                    .log_input(format_args!("input_clear frame={frame}"));
                self.emit(emu, "ok input_clear");
            }
            Command::DumpRegs => {
                let block = emu.master_regs().text_block("master");
                self.emit(emu, &block);
            }
            Command::DumpSlaveRegs => {
                let block = emu.slave_regs().text_block("slave");
                self.emit(emu, &block);
            }
            Command::DumpRegsBin { path } => {
                let msg = match snapshot::write_regs_bin(&path, &emu.master_regs()) {
                    Ok(()) => format!("ok dump_regs_bin {}", path.display()),
                    Err(e) => format!("error dump_regs_bin: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::DumpSlaveRegsBin { path } => {
                let msg = match snapshot::write_regs_bin(&path, &emu.slave_regs()) {
                    Ok(()) => format!("ok dump_slave_regs_bin {}", path.display()),
                    Err(e) => format!("error dump_slave_regs_bin: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::DumpMem { addr, size } => {
                let dump = snapshot::hex_dump(&*emu, addr, size);
                self.emit(emu, &dump);
            }
            Command::DumpMemBin { addr, size, path } => {
                let msg = match snapshot::write_mem_bin(&*emu, addr, size, &path) {
                    Ok(written) => format!("ok dump_mem_bin 0x{addr:08x} 0x{written:x}"),
                    Err(e) => format!("error dump_mem_bin: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::DumpVdp2Regs { path } => {
                let msg = match snapshot::write_vdp2_regs(&*emu, &path) {
                    Ok(()) => format!("ok dump_vdp2_regs {}", path.display()),
                    Err(e) => format!("error dump_vdp2_regs: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::Screenshot { path } => {
                let msg = format!("ok screenshot_queued {}", path.display());
                self.pending_screenshot = Some(path);
                self.emit(emu, &msg);
            }
            Command::Step { count } => {
                self.step = StepState::CountingDown { remaining: count };
                // Stepping out of a frame-level pause has to let the CPU
                // run; the pause re-lands at instruction granularity.
                if self.frame_mode == FrameMode::Paused {
                    self.frame_mode = FrameMode::Free;
                }
                self.recompute_hook(emu);
                let msg = format!("ok step {count}");
                self.emit(emu, &msg);
            }
            Command::Breakpoint { addr } => {
                self.breakpoints.add(addr);
                self.recompute_hook(emu);
                let msg = format!(
                    "ok breakpoint 0x{addr:08x} total={}",
                    self.breakpoints.len()
                );
                self.emit(emu, &msg);
            }
            Command::BreakpointClear => {
                let removed = self.breakpoints.clear();
                self.recompute_hook(emu);
                let msg = format!("ok breakpoint_clear removed={removed}");
                self.emit(emu, &msg);
            }
            Command::BreakpointList => {
                let mut msg = format!("breakpoints count={}", self.breakpoints.len());
                for addr in self.breakpoints.iter() {
                    let _ = write!(msg, " 0x{addr:08x}");
                }
                self.emit(emu, &msg);
            }
            Command::Continue => {
                self.step = StepState::Disarmed;
                // Resuming toward the next breakpoint needs instructions to
                // flow, so a frame-level pause is released as well.
                if self.frame_mode == FrameMode::Paused {
                    self.frame_mode = FrameMode::Free;
                }
                self.recompute_hook(emu);
                self.emit(emu, "ok continue");
            }
            Command::DumpCycle => {
                let msg = format!("ok dump_cycle value={}", emu.master_cycle());
                self.emit(emu, &msg);
            }
            Command::RunToCycle { target } => {
                self.step = StepState::Disarmed;
                self.cancel_pc_trace_advance();
                self.recompute_hook(emu);
                self.run_to_cycle = Some(target);
                self.frame_mode = FrameMode::Free;
                let msg = format!("ok run_to_cycle target={target}");
                self.emit(emu, &msg);
            }
            Command::Deterministic => {
                emu.set_deterministic();
                self.emit(emu, "ok deterministic");
            }
            Command::PcTraceFrame { path } => match self.traces.arm_pc(&path) {
                Ok(()) => {
                    self.step = StepState::Disarmed;
                    self.run_to_cycle = None;
                    self.frame_mode = FrameMode::Advance {
                        remaining: 1,
                        pc_trace: true,
                    };
                    self.recompute_hook(emu);
                    self.emit(emu, "ok pc_trace_frame_started");
                }
                Err(e) => {
                    let msg = format!("error pc_trace_frame: {e}");
                    self.emit(emu, &msg);
                }
            },
            Command::CallTrace { path } => {
                let msg = match self.traces.arm_call(&path) {
                    Ok(()) => format!("ok call_trace {}", path.display()),
                    Err(e) => format!("error call_trace: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::CallTraceStop => {
                self.traces.close_call();
                self.emit(emu, "ok call_trace_stop");
            }
            Command::InsnTrace {
                path,
                start_line,
                stop_line,
            } => {
                let msg = match self.traces.arm_insn_file(&path, start_line, stop_line) {
                    Ok(()) => {
                        self.recompute_hook(emu);
                        format!("ok insn_trace {} {start_line} {stop_line}", path.display())
                    }
                    Err(e) => format!("error insn_trace: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::InsnTraceUnified {
                start_line,
                stop_line,
            } => {
                let msg = match self.traces.arm_insn_unified(start_line, stop_line) {
                    Ok(()) => {
                        self.recompute_hook(emu);
                        format!("ok insn_trace_unified {start_line} {stop_line}")
                    }
                    Err(reason) => format!("error insn_trace_unified: {reason}"),
                };
                self.emit(emu, &msg);
            }
            Command::InsnTraceStop => {
                self.traces.disarm_insn();
                self.recompute_hook(emu);
                self.emit(emu, "ok insn_trace_stop");
            }
            Command::UnifiedTrace { path } => {
                let msg = match self.traces.arm_unified(&path) {
                    Ok(()) => format!("ok unified_trace {}", path.display()),
                    Err(e) => format!("error unified_trace: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::UnifiedTraceStop => {
                if self.traces.close_unified() {
                    self.recompute_hook(emu);
                }
                self.emit(emu, "ok unified_trace_stop");
            }
            Command::ScdqTrace { path } => {
                let msg = match self.traces.arm_scdq(&path) {
                    Ok(()) => format!("ok scdq_trace {}", path.display()),
                    Err(e) => format!("error scdq_trace: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::ScdqTraceStop => {
                self.traces.close_scdq();
                self.emit(emu, "ok scdq_trace_stop");
            }
            Command::CdbTrace { path } => {
                let msg = match self.traces.arm_cdb(&path) {
                    Ok(()) => format!("ok cdb_trace {}", path.display()),
                    Err(e) => format!("error cdb_trace: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::CdbTraceStop => {
                self.traces.close_cdb();
                self.emit(emu, "ok cdb_trace_stop");
            }
            Command::InputTrace { path } => {
                let msg = match self.traces.arm_input(&path) {
                    Ok(()) => format!("ok input_trace {}", path.display()),
                    Err(e) => format!("error input_trace: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::InputTraceStop => {
                self.traces.close_input();
                self.emit(emu, "ok input_trace_stop");
            }
            Command::Watchpoint { addr } => {
                self.watch.arm_single(addr);
                let msg = format!("ok watchpoint 0x{addr:08x}");
                self.emit(emu, &msg);
            }
            Command::WatchpointClear => {
                self.watch.clear_single();
                self.emit(emu, "ok watchpoint_clear");
            }
            Command::Vdp2Watchpoint { lo, hi, path } => {
                let msg = match self.watch.arm_range(lo, hi, &path) {
                    Ok(()) => format!("ok vdp2_watchpoint 0x{lo:08x} 0x{hi:08x} {}", path.display()),
                    Err(e) => format!("error vdp2_watchpoint: {e}"),
                };
                self.emit(emu, &msg);
            }
            Command::Vdp2WatchpointClear => {
                self.watch.clear_range();
                self.emit(emu, "ok vdp2_watchpoint_clear");
            }
            Command::ShowWindow => {
                self.pending_window_show = true;
                self.emit(emu, "ok show_window");
            }
            Command::HideWindow => {
                self.pending_window_hide = true;
                self.emit(emu, "ok hide_window");
            }
        }
    }
}
