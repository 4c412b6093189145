//! End-to-end harness: a `MockSaturn` + `Automation` pair runs on a worker
//! thread the way an emulator host would, while the test plays orchestrator
//! through the real action/ack files.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use saturnium_automation::{Automation, AutomationConfig, ScreenshotEncoder};
use saturnium_machine::mock::MockSaturn;
use saturnium_machine::{CdEvent, CdbClass, CpuId, Machine, WriteSource};

/// The mock's instruction stream: 2-byte instructions looping over this
/// window of work RAM.
pub const PROGRAM_BASE: u32 = 0x0600_0000;
pub const PROGRAM_LEN: u32 = 0x1_0000;
pub const INSTR_PER_FRAME: u32 = 64;

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// A bus write the emulator thread performs at the end of a given frame.
pub struct ScheduledWrite {
    pub frame: u64,
    pub source: WriteSource,
    pub addr: u32,
    pub old: u32,
    pub new: u32,
}

pub struct Harness {
    pub dir: PathBuf,
    seq: u64,
    join: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn start(name: &str) -> Self {
        Self::start_with_writes(name, Vec::new())
    }

    pub fn start_with_writes(name: &str, writes: Vec<ScheduledWrite>) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "saturnium-it-{name}-{}-{id}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let base = dir.clone();
        let join = thread::spawn(move || emulator_main(base, writes));
        Self {
            dir,
            seq: 0,
            join: Some(join),
        }
    }

    /// Orchestrator send: write to a sibling temp path, then rename, with a
    /// fresh header sequence each batch.
    pub fn send(&mut self, commands: &[&str]) {
        self.seq += 1;
        let mut body = format!("# {}\n", self.seq);
        for cmd in commands {
            body.push_str(cmd);
            body.push('\n');
        }
        let tmp = self.dir.join("mednafen_action.txt.tmp");
        fs::write(&tmp, body).unwrap();
        fs::rename(&tmp, self.dir.join("mednafen_action.txt")).unwrap();
    }

    pub fn read_ack(&self) -> String {
        fs::read_to_string(self.dir.join("mednafen_ack.txt")).unwrap_or_default()
    }

    /// Poll the ack file until `pred` holds; panics after 10 s.
    pub fn wait_ack(&self, pred: impl Fn(&str) -> bool) -> String {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let body = self.read_ack();
            if pred(&body) {
                return body;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for ack; last seen: {body:?}"
            );
            thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn wait_ack_containing(&self, needle: &str) -> String {
        self.wait_ack(|body| body.contains(needle))
    }

    /// Quit, join the emulator thread, and check the shutdown ack.
    pub fn finish(mut self) {
        self.send(&["quit"]);
        if let Some(join) = self.join.take() {
            join.join().expect("emulator thread panicked");
        }
        assert!(self.read_ack().contains("shutdown frame="));
    }
}

pub fn ack_seq(body: &str) -> u64 {
    body.rsplit("seq=")
        .next()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn emulator_main(base: PathBuf, writes: Vec<ScheduledWrite>) {
    let mut emu = MockSaturn::new();
    for i in 0..64u32 {
        emu.poke(PROGRAM_BASE + i, i as u8);
    }
    emu.set_framebuffer(16, 8, vec![0xff00_ff00; 16 * 8]);

    let encoder: ScreenshotEncoder = Box::new(|view, path| {
        let mut f = fs::File::create(path)?;
        f.write_all(&view.width.to_le_bytes())?;
        f.write_all(&view.height.to_le_bytes())?;
        Ok(())
    });
    let cfg = AutomationConfig::new(&base, encoder).poll_interval(Duration::from_millis(1));
    let mut auto = Automation::activate(cfg).expect("activate");

    // Frame-0 gate: the mandated paused start, before any frame runs.
    auto.wait_while_paused(&mut emu);

    let mut pc = PROGRAM_BASE;
    let mut frame: u64 = 0;
    while !emu.exit_requested() {
        frame += 1;

        // One synthetic subroutine call and one CD command per frame keep
        // the event-driven recorders fed.
        auto.on_subroutine_call(&emu, CpuId::Master, pc.wrapping_add(8), 0x0602_0000);
        auto.on_cd_event(
            &emu,
            CdEvent::Cdb {
                class: CdbClass::Cmd,
                payload: "51 00 00 00",
            },
        );

        for _ in 0..INSTR_PER_FRAME {
            emu.begin_instruction(pc);
            if emu.hook_enabled() {
                auto.on_instruction(&mut emu, pc);
            }
            if emu.exit_requested() {
                break;
            }
            pc = PROGRAM_BASE + ((pc + 2 - PROGRAM_BASE) % PROGRAM_LEN);
        }

        for w in writes.iter().filter(|w| w.frame == frame) {
            let store_pc = emu.master_regs().pc;
            auto.on_write(&emu, w.source, store_pc, 0x0600_0010, w.addr, w.old, w.new);
        }

        if emu.exit_requested() {
            break;
        }
        auto.frame_tick(&mut emu);
        // Keep free-run from spinning the host CPU flat out.
        thread::sleep(Duration::from_micros(200));
    }

    auto.shutdown(&emu);
}
