use std::path::PathBuf;

/// One parsed orchestrator command. Numeric arguments are decimal unless the
/// command's schema says hexadecimal (addresses and sizes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FrameAdvance { frames: u64 },
    RunToFrame { target: u64 },
    Run,
    Pause,
    Quit,
    Status,
    Input { name: String },
    InputRelease { name: String },
    InputClear,
    DumpRegs,
    DumpSlaveRegs,
    DumpRegsBin { path: PathBuf },
    DumpSlaveRegsBin { path: PathBuf },
    DumpMem { addr: u32, size: u32 },
    DumpMemBin { addr: u32, size: u32, path: PathBuf },
    DumpVdp2Regs { path: PathBuf },
    Screenshot { path: PathBuf },
    Step { count: u64 },
    Breakpoint { addr: u32 },
    BreakpointClear,
    BreakpointList,
    Continue,
    DumpCycle,
    RunToCycle { target: u64 },
    Deterministic,
    PcTraceFrame { path: PathBuf },
    CallTrace { path: PathBuf },
    CallTraceStop,
    InsnTrace { path: PathBuf, start_line: u64, stop_line: u64 },
    InsnTraceUnified { start_line: u64, stop_line: u64 },
    InsnTraceStop,
    UnifiedTrace { path: PathBuf },
    UnifiedTraceStop,
    ScdqTrace { path: PathBuf },
    ScdqTraceStop,
    CdbTrace { path: PathBuf },
    CdbTraceStop,
    InputTrace { path: PathBuf },
    InputTraceStop,
    Watchpoint { addr: u32 },
    WatchpointClear,
    Vdp2Watchpoint { lo: u32, hi: u32, path: PathBuf },
    Vdp2WatchpointClear,
    ShowWindow,
    HideWindow,
}

/// Parse failure, already shaped for the error ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// `error unknown command: <word>`
    Unknown { word: String },
    /// `error <cmd>: <reason>`
    Invalid { cmd: &'static str, reason: String },
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut tokens = line.split_whitespace();
    let Some(word) = tokens.next() else {
        return Err(ParseError::Unknown {
            word: String::new(),
        });
    };

    match word {
        "frame_advance" => Ok(Command::FrameAdvance {
            frames: count_arg("frame_advance", tokens.next())?,
        }),
        "run_to_frame" => Ok(Command::RunToFrame {
            target: dec_arg("run_to_frame", tokens.next())?,
        }),
        "run" => Ok(Command::Run),
        "pause" => Ok(Command::Pause),
        "quit" => Ok(Command::Quit),
        "status" => Ok(Command::Status),
        "input" => Ok(Command::Input {
            name: name_arg("input", tokens.next())?,
        }),
        "input_release" => Ok(Command::InputRelease {
            name: name_arg("input_release", tokens.next())?,
        }),
        "input_clear" => Ok(Command::InputClear),
        "dump_regs" => Ok(Command::DumpRegs),
        "dump_slave_regs" => Ok(Command::DumpSlaveRegs),
        "dump_regs_bin" => Ok(Command::DumpRegsBin {
            path: path_arg("dump_regs_bin", tokens.next())?,
        }),
        "dump_slave_regs_bin" => Ok(Command::DumpSlaveRegsBin {
            path: path_arg("dump_slave_regs_bin", tokens.next())?,
        }),
        "dump_mem" => {
            let addr = hex_arg("dump_mem", tokens.next())?;
            // Size defaults to 256 bytes when omitted.
            let size = match tokens.next() {
                Some(tok) => hex_val("dump_mem", tok)?,
                None => 0x100,
            };
            Ok(Command::DumpMem { addr, size })
        }
        "dump_mem_bin" => Ok(Command::DumpMemBin {
            addr: hex_arg("dump_mem_bin", tokens.next())?,
            size: hex_arg("dump_mem_bin", tokens.next())?,
            path: path_arg("dump_mem_bin", tokens.next())?,
        }),
        "dump_vdp2_regs" => Ok(Command::DumpVdp2Regs {
            path: path_arg("dump_vdp2_regs", tokens.next())?,
        }),
        "screenshot" => Ok(Command::Screenshot {
            path: path_arg("screenshot", tokens.next())?,
        }),
        "step" => Ok(Command::Step {
            count: count_arg("step", tokens.next())?,
        }),
        "breakpoint" => Ok(Command::Breakpoint {
            addr: hex_arg("breakpoint", tokens.next())?,
        }),
        "breakpoint_clear" => Ok(Command::BreakpointClear),
        "breakpoint_list" => Ok(Command::BreakpointList),
        "continue" => Ok(Command::Continue),
        "dump_cycle" => Ok(Command::DumpCycle),
        "run_to_cycle" => Ok(Command::RunToCycle {
            target: dec_arg("run_to_cycle", tokens.next())?,
        }),
        "deterministic" => Ok(Command::Deterministic),
        "pc_trace_frame" => Ok(Command::PcTraceFrame {
            path: path_arg("pc_trace_frame", tokens.next())?,
        }),
        "call_trace" => Ok(Command::CallTrace {
            path: path_arg("call_trace", tokens.next())?,
        }),
        "call_trace_stop" => Ok(Command::CallTraceStop),
        "insn_trace" => Ok(Command::InsnTrace {
            path: path_arg("insn_trace", tokens.next())?,
            start_line: dec_arg("insn_trace", tokens.next())?,
            stop_line: dec_arg("insn_trace", tokens.next())?,
        }),
        "insn_trace_unified" => Ok(Command::InsnTraceUnified {
            start_line: dec_arg("insn_trace_unified", tokens.next())?,
            stop_line: dec_arg("insn_trace_unified", tokens.next())?,
        }),
        "insn_trace_stop" => Ok(Command::InsnTraceStop),
        "unified_trace" => Ok(Command::UnifiedTrace {
            path: path_arg("unified_trace", tokens.next())?,
        }),
        "unified_trace_stop" => Ok(Command::UnifiedTraceStop),
        "scdq_trace" => Ok(Command::ScdqTrace {
            path: path_arg("scdq_trace", tokens.next())?,
        }),
        "scdq_trace_stop" => Ok(Command::ScdqTraceStop),
        "cdb_trace" => Ok(Command::CdbTrace {
            path: path_arg("cdb_trace", tokens.next())?,
        }),
        "cdb_trace_stop" => Ok(Command::CdbTraceStop),
        "input_trace" => Ok(Command::InputTrace {
            path: path_arg("input_trace", tokens.next())?,
        }),
        "input_trace_stop" => Ok(Command::InputTraceStop),
        "watchpoint" => Ok(Command::Watchpoint {
            addr: hex_arg("watchpoint", tokens.next())?,
        }),
        "watchpoint_clear" => Ok(Command::WatchpointClear),
        "vdp2_watchpoint" => Ok(Command::Vdp2Watchpoint {
            lo: hex_arg("vdp2_watchpoint", tokens.next())?,
            hi: hex_arg("vdp2_watchpoint", tokens.next())?,
            path: path_arg("vdp2_watchpoint", tokens.next())?,
        }),
        "vdp2_watchpoint_clear" => Ok(Command::Vdp2WatchpointClear),
        "show_window" => Ok(Command::ShowWindow),
        "hide_window" => Ok(Command::HideWindow),
        other => Err(ParseError::Unknown {
            word: other.to_string(),
        }),
    }
}

/// Optional decimal count, default 1, floor 1 (negative values coerce up).
fn count_arg(cmd: &'static str, tok: Option<&str>) -> Result<u64, ParseError> {
    let Some(tok) = tok else {
        return Ok(1);
    };
    let n: i64 = tok.parse().map_err(|_| ParseError::Invalid {
        cmd,
        reason: format!("bad count {tok}"),
    })?;
    Ok(n.max(1) as u64)
}

/// Required decimal argument; negatives clamp to zero.
fn dec_arg(cmd: &'static str, tok: Option<&str>) -> Result<u64, ParseError> {
    let Some(tok) = tok else {
        return Err(ParseError::Invalid {
            cmd,
            reason: "missing numeric argument".to_string(),
        });
    };
    let n: i64 = tok.parse().map_err(|_| ParseError::Invalid {
        cmd,
        reason: format!("bad number {tok}"),
    })?;
    Ok(n.max(0) as u64)
}

/// Required hexadecimal argument, with or without a `0x` prefix.
fn hex_arg(cmd: &'static str, tok: Option<&str>) -> Result<u32, ParseError> {
    let Some(tok) = tok else {
        return Err(ParseError::Invalid {
            cmd,
            reason: "missing hex argument".to_string(),
        });
    };
    hex_val(cmd, tok)
}

fn hex_val(cmd: &'static str, tok: &str) -> Result<u32, ParseError> {
    let digits = tok
        .strip_prefix("0x")
        .or_else(|| tok.strip_prefix("0X"))
        .unwrap_or(tok);
    u32::from_str_radix(digits, 16).map_err(|_| ParseError::Invalid {
        cmd,
        reason: format!("bad hex value {tok}"),
    })
}

fn path_arg(cmd: &'static str, tok: Option<&str>) -> Result<PathBuf, ParseError> {
    match tok {
        Some(tok) => Ok(PathBuf::from(tok)),
        None => Err(ParseError::Invalid {
            cmd,
            reason: "no path specified".to_string(),
        }),
    }
}

fn name_arg(cmd: &'static str, tok: Option<&str>) -> Result<String, ParseError> {
    match tok {
        Some(tok) => Ok(tok.to_string()),
        None => Err(ParseError::Invalid {
            cmd,
            reason: "missing button name".to_string(),
        }),
    }
}
