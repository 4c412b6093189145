//! Orchestrator-level scenarios: the test drives the control plane the way
//! the external tool does, through the action/ack files only.

mod common;

use common::{Harness, INSTR_PER_FRAME, ScheduledWrite, ack_seq};
use saturnium_machine::WriteSource;
use std::fs;

#[test]
fn launch_then_advance_three_frames() {
    let h = Harness::start("advance3");

    let ready = h.wait_ack(|b| b.starts_with("ready frame=0"));
    assert_eq!(ready, "ready frame=0 cycle=0 seq=1\n");

    let mut h = h;
    h.send(&["frame_advance 3"]);
    let done = h.wait_ack_containing("done frame_advance frame=3");
    assert_eq!(ack_seq(&done), 3, "ok=2, done=3: {done:?}");

    h.finish();
}

#[test]
fn breakpoint_continue_step_and_register_snapshots() {
    let mut h = Harness::start("bp-step");
    h.wait_ack_containing("ready frame=0");

    h.send(&["breakpoint 06004000"]);
    let body = h.wait_ack_containing("ok breakpoint 0x06004000 total=1");
    assert_eq!(ack_seq(&body), 2);

    h.send(&["continue"]);
    let brk = h.wait_ack_containing("break pc=0x06004000");
    assert!(brk.contains("addr=0x06004000"));
    assert_eq!(ack_seq(&brk), 4, "ok continue=3, break=4: {brk:?}");

    // Snapshot commands work while instruction-paused.
    let regs_bin = h.dir.join("r.bin");
    h.send(&[&format!("dump_regs_bin {}", regs_bin.display())]);
    h.wait_ack_containing("ok dump_regs_bin");
    let bytes = fs::read(&regs_bin).unwrap();
    assert_eq!(bytes.len(), 88);
    // PC is word 16 of the fixed layout and must hold the break address.
    assert_eq!(&bytes[16 * 4..16 * 4 + 4], &0x0600_4000u32.to_le_bytes());

    // Round-trip: the text dump agrees with the binary one.
    h.send(&["dump_regs"]);
    let text = h.wait_ack_containing("regs master");
    assert!(text.contains("PC=0x06004000"));

    h.send(&["step 4"]);
    let done = h.wait_ack_containing("done step pc=");
    // Decode PC of the 4th instruction is 0x06004008; the reported fetch PC
    // sits one pipeline depth (+4 in the mock) ahead.
    assert!(done.contains("done step pc=0x0600400c"), "{done:?}");

    h.finish();
}

#[test]
fn watchpoint_sees_cpu_and_dma_writes_until_cleared() {
    let writes = vec![
        ScheduledWrite {
            frame: 4,
            source: WriteSource::Cpu,
            addr: 0x0601_0000,
            old: 0,
            new: 0x1111,
        },
        ScheduledWrite {
            frame: 5,
            source: WriteSource::Dma,
            addr: 0x0601_0000,
            old: 0x1111,
            new: 0x2222,
        },
        ScheduledWrite {
            frame: 6,
            source: WriteSource::Cpu,
            addr: 0x0601_0000,
            old: 0x2222,
            new: 0x3333,
        },
    ];
    let mut h = Harness::start_with_writes("wp-dma", writes);
    h.wait_ack_containing("ready frame=0");

    h.send(&["watchpoint 06010000"]);
    h.wait_ack_containing("ok watchpoint 0x06010000");

    let hits_path = h.dir.join("watchpoint_hits.txt");

    h.send(&["frame_advance 4"]);
    h.wait_ack_containing("done frame_advance frame=4");
    let hits = fs::read_to_string(&hits_path).unwrap();
    assert_eq!(hits.lines().count(), 1, "CPU-path hit: {hits:?}");
    assert!(hits.contains("addr=0x06010000"));
    assert!(hits.contains("new=0x00001111"));

    h.send(&["frame_advance 1"]);
    h.wait_ack_containing("done frame_advance frame=5");
    let hits = fs::read_to_string(&hits_path).unwrap();
    assert_eq!(hits.lines().count(), 2, "DMA-path hit: {hits:?}");
    assert!(hits.contains("new=0x00002222"));

    h.send(&["watchpoint_clear"]);
    h.wait_ack_containing("ok watchpoint_clear");
    h.send(&["frame_advance 1"]);
    h.wait_ack_containing("done frame_advance frame=6");
    let hits = fs::read_to_string(&hits_path).unwrap();
    assert_eq!(hits.lines().count(), 2, "disarmed: no further hits");

    h.finish();
}

#[test]
fn pc_trace_frame_captures_exactly_one_frame() {
    let mut h = Harness::start("pctrace");
    h.wait_ack_containing("ready frame=0");

    let trace = h.dir.join("pc.bin");
    h.send(&[&format!("pc_trace_frame {}", trace.display())]);
    h.wait_ack_containing("done pc_trace_frame frame=1");

    let bytes = fs::read(&trace).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(bytes.len() % 4, 0);
    assert_eq!(bytes.len(), INSTR_PER_FRAME as usize * 4);
    assert_eq!(&bytes[0..4], &0x0600_0000u32.to_le_bytes());

    h.finish();
}

#[test]
fn unknown_command_is_reported() {
    let mut h = Harness::start("unknown");
    h.wait_ack_containing("ready frame=0");

    h.send(&["zorkmid 42"]);
    h.wait_ack_containing("error unknown command: zorkmid");

    h.finish();
}

#[test]
fn run_to_frame_pauses_at_target() {
    let mut h = Harness::start("rtf");
    h.wait_ack_containing("ready frame=0");

    h.send(&["run_to_frame 8"]);
    h.wait_ack_containing("done run_to_frame frame=8");

    h.send(&["status"]);
    let status = h.wait_ack_containing("status frame=8");
    assert!(status.contains("paused=true"));
    assert!(status.contains("inst_paused=false"));

    h.finish();
}

#[test]
fn run_then_pause_stops_at_a_frame_boundary() {
    let mut h = Harness::start("run-pause");
    h.wait_ack_containing("ready frame=0");

    h.send(&["run"]);
    h.wait_ack_containing("ok run");
    h.send(&["pause"]);
    h.wait_ack_containing("ok pause frame=");

    h.finish();
}

#[test]
fn dump_cycle_and_run_to_cycle() {
    let mut h = Harness::start("cycles");
    h.wait_ack_containing("ready frame=0");

    h.send(&["dump_cycle"]);
    let body = h.wait_ack_containing("ok dump_cycle value=");
    let value: u64 = body
        .split("value=")
        .nth(1)
        .and_then(|s| s.split_whitespace().next())
        .and_then(|s| s.parse().ok())
        .unwrap();

    h.send(&[&format!("run_to_cycle {}", value + 50_000)]);
    let done = h.wait_ack_containing("done run_to_cycle cycle=");
    assert!(done.contains("frame="));

    h.finish();
}

#[test]
fn memory_dump_shows_seeded_bytes() {
    let mut h = Harness::start("dumpmem");
    h.wait_ack_containing("ready frame=0");

    h.send(&["dump_mem 06000000 20"]);
    let body = h.wait_ack_containing("mem 06000000");
    assert!(body.contains("\n00 01 02 03 "));
    // 0x20 bytes = two 16-byte rows plus the header and suffix line.
    assert_eq!(body.lines().count(), 3);

    h.finish();
}

#[test]
fn event_traces_arm_and_disarm_over_the_protocol() {
    let mut h = Harness::start("traces");
    h.wait_ack_containing("ready frame=0");

    let call = h.dir.join("call.txt");
    let unified = h.dir.join("unified.txt");
    let cdb = h.dir.join("cdb.txt");
    let input = h.dir.join("input.txt");
    h.send(&[
        &format!("call_trace {}", call.display()),
        &format!("unified_trace {}", unified.display()),
        &format!("cdb_trace {}", cdb.display()),
        &format!("input_trace {}", input.display()),
        "input A",
    ]);
    h.wait_ack_containing("ok input A");

    h.send(&["frame_advance 2"]);
    h.wait_ack_containing("done frame_advance frame=2");

    h.send(&[
        "call_trace_stop",
        "unified_trace_stop",
        "cdb_trace_stop",
        "input_trace_stop",
    ]);
    h.wait_ack_containing("ok input_trace_stop");

    // One synthetic call and one CD command per frame, two frames traced.
    let call_body = fs::read_to_string(&call).unwrap();
    assert_eq!(call_body.lines().count(), 2);
    assert!(call_body.lines().all(|l| l.contains(" M ") && l.contains("06020000")));

    // The unified stream interleaves call events with CD CMD events.
    let unified_body = fs::read_to_string(&unified).unwrap();
    assert_eq!(unified_body.lines().count(), 4);
    assert!(unified_body.contains(" CMD 51 00 00 00"));

    let cdb_body = fs::read_to_string(&cdb).unwrap();
    assert_eq!(cdb_body.lines().count(), 2);
    assert!(cdb_body.lines().all(|l| l.contains("CMD 51 00 00 00")));

    let input_body = fs::read_to_string(&input).unwrap();
    assert_eq!(input_body.trim(), "input A frame=0");

    h.finish();
}

#[test]
fn insn_trace_window_over_the_protocol() {
    let mut h = Harness::start("insn");
    h.wait_ack_containing("ready frame=0");

    let path = h.dir.join("insn.txt");
    h.send(&[&format!("insn_trace {} 1 10", path.display())]);
    h.wait_ack_containing("ok insn_trace");

    h.send(&["frame_advance 1"]);
    h.wait_ack_containing("done frame_advance frame=1");

    // The window covers lines 1..=10 and then disarms itself.
    let body = fs::read_to_string(&path).unwrap();
    assert_eq!(body.lines().count(), 10);
    assert!(body.lines().all(|l| l.contains(" m ")));
    // First instruction of frame 1: pc 0x06000000, opcode from seeded RAM
    // (big-endian byte pair 00 01).
    let fields: Vec<&str> = body.lines().next().unwrap().split_whitespace().collect();
    assert_eq!(&fields[1..], ["m", "06000000", "0001"]);

    h.send(&["insn_trace_stop"]);
    h.wait_ack_containing("ok insn_trace_stop");

    h.finish();
}

#[test]
fn vdp2_range_watch_logs_writes_without_hit_acks() {
    let writes = vec![
        ScheduledWrite {
            frame: 2,
            source: WriteSource::Dma,
            addr: 0x25E0_0010,
            old: 0,
            new: 0xbeef,
        },
        ScheduledWrite {
            frame: 2,
            source: WriteSource::Cpu,
            addr: 0x25F0_0000, // outside the watched range
            old: 0,
            new: 1,
        },
    ];
    let mut h = Harness::start_with_writes("vdp2", writes);
    h.wait_ack_containing("ready frame=0");

    let log = h.dir.join("vdp2_writes.txt");
    h.send(&[&format!("vdp2_watchpoint 25E00000 25E7FFFF {}", log.display())]);
    h.wait_ack_containing("ok vdp2_watchpoint 0x25e00000 0x25e7ffff");

    h.send(&["frame_advance 2"]);
    h.wait_ack_containing("done frame_advance frame=2");

    let body = fs::read_to_string(&log).unwrap();
    assert_eq!(body.lines().count(), 1);
    assert!(body.contains("addr=0x25e00010"));
    assert!(body.contains("new=0x0000beef"));

    h.send(&["vdp2_watchpoint_clear"]);
    h.wait_ack_containing("ok vdp2_watchpoint_clear");

    h.finish();
}

#[test]
fn binary_snapshots_and_window_flags() {
    let mut h = Harness::start("snaps");
    h.wait_ack_containing("ready frame=0");

    h.send(&["dump_slave_regs"]);
    h.wait_ack_containing("regs slave");

    let mem_bin = h.dir.join("mem.bin");
    h.send(&[&format!("dump_mem_bin 06000000 40 {}", mem_bin.display())]);
    h.wait_ack_containing("ok dump_mem_bin 0x06000000 0x40");
    let bytes = fs::read(&mem_bin).unwrap();
    assert_eq!(bytes.len(), 0x40);
    assert_eq!(&bytes[0..4], &[0, 1, 2, 3]);

    let vdp2 = h.dir.join("vdp2.bin");
    h.send(&[&format!("dump_vdp2_regs {}", vdp2.display())]);
    h.wait_ack_containing("ok dump_vdp2_regs");
    assert_eq!(fs::metadata(&vdp2).unwrap().len(), 0x200);

    h.send(&["hide_window"]);
    h.wait_ack_containing("ok hide_window");

    h.finish();
}

#[test]
fn unopenable_trace_path_reports_an_error_ack() {
    let mut h = Harness::start("badpath");
    h.wait_ack_containing("ready frame=0");

    h.send(&["call_trace /nonexistent-dir/x/call.txt"]);
    h.wait_ack_containing("error call_trace:");

    // The plane stays usable afterwards.
    h.send(&["frame_advance 1"]);
    h.wait_ack_containing("done frame_advance frame=1");

    h.finish();
}

#[test]
fn screenshot_is_queued_then_taken_on_the_next_frame() {
    let mut h = Harness::start("shot");
    h.wait_ack_containing("ready frame=0");

    let shot = h.dir.join("shot.bin");
    h.send(&[&format!("screenshot {}", shot.display())]);
    h.wait_ack_containing("ok screenshot_queued");

    h.send(&["frame_advance 1"]);
    h.wait_ack_containing("done frame_advance frame=1");

    // The harness encoder records the frame dimensions.
    let bytes = fs::read(&shot).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[0..4], &16u32.to_le_bytes());

    h.finish();
}

#[test]
fn ack_sequence_strictly_increases_across_commands() {
    let mut h = Harness::start("seq");
    let mut last = ack_seq(&h.wait_ack_containing("ready frame=0"));
    assert_eq!(last, 1);

    for (cmd, needle) in [
        ("frame_advance 2", "done frame_advance frame=2"),
        ("status", "status frame=2"),
        ("breakpoint 06004000", "ok breakpoint"),
        ("breakpoint_list", "breakpoints count=1 0x06004000"),
        ("breakpoint_clear", "ok breakpoint_clear removed=1"),
        ("deterministic", "ok deterministic"),
        ("show_window", "ok show_window"),
    ] {
        h.send(&[cmd]);
        let seq = ack_seq(&h.wait_ack_containing(needle));
        assert!(seq > last, "seq must increase: {seq} after {last} ({cmd})");
        last = seq;
    }

    h.finish();
}

#[test]
fn identical_action_header_is_not_redispatched() {
    let mut h = Harness::start("dedup");
    h.wait_ack_containing("ready frame=0");

    h.send(&["frame_advance 1"]);
    let done = h.wait_ack_containing("done frame_advance frame=1");
    let seq = ack_seq(&done);

    // Rewrite the same batch byte-for-byte: same header, no dispatch. Give
    // the plane a few poll rounds to (not) react.
    let body = fs::read_to_string(h.dir.join("mednafen_action.txt")).unwrap();
    fs::write(h.dir.join("mednafen_action.txt"), &body).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(ack_seq(&h.read_ack()), seq);

    // Padding after the sequence number registers as a new header.
    let padded = body.replacen("# 1\n", "# 1   \n", 1);
    fs::write(h.dir.join("mednafen_action.txt"), padded).unwrap();
    h.wait_ack_containing("done frame_advance frame=2");

    h.finish();
}
