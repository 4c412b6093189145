use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Arming mode. Single-address and range watches are mutually exclusive.
#[derive(Debug)]
enum WatchMode {
    Off,
    Single { addr: u32 },
    Range { lo: u32, hi: u32 },
}

/// Write observation over both physical paths (CPU store and SCU-DMA).
/// Detection never blocks the emulator; a hit appends one line to the log
/// and, in single mode, asks the caller to emit a `hit watchpoint` ack.
///
/// The line is formatted into a reused scratch buffer so a DMA storm
/// (millions of hits per second) allocates nothing per hit.
pub struct WatchpointEngine {
    mode: WatchMode,
    hits_path: PathBuf,
    hits_file: Option<File>,
    range_file: Option<File>,
    scratch: String,
    failure: Option<String>,
}

impl WatchpointEngine {
    pub fn new(hits_path: PathBuf) -> Self {
        Self {
            mode: WatchMode::Off,
            hits_path,
            hits_file: None,
            range_file: None,
            scratch: String::with_capacity(128),
            failure: None,
        }
    }

    pub fn arm_single(&mut self, addr: u32) {
        self.range_file = None;
        self.mode = WatchMode::Single { addr };
        debug!(addr = format_args!("{addr:08x}"), "watchpoint armed");
    }

    /// Arm a range watch; the log file is created (truncated) now so a run
    /// with zero hits still leaves an empty file behind.
    pub fn arm_range(&mut self, lo: u32, hi: u32, log_path: &Path) -> std::io::Result<()> {
        let file = File::create(log_path)?;
        self.hits_file = None;
        self.range_file = Some(file);
        self.mode = WatchMode::Range { lo, hi };
        debug!(
            lo = format_args!("{lo:08x}"),
            hi = format_args!("{hi:08x}"),
            "range watchpoint armed"
        );
        Ok(())
    }

    pub fn clear_single(&mut self) {
        if matches!(self.mode, WatchMode::Single { .. }) {
            self.mode = WatchMode::Off;
        }
        self.hits_file = None;
    }

    pub fn clear_range(&mut self) {
        if matches!(self.mode, WatchMode::Range { .. }) {
            self.mode = WatchMode::Off;
        }
        self.range_file = None;
    }

    pub fn close(&mut self) {
        self.mode = WatchMode::Off;
        self.hits_file = None;
        self.range_file = None;
    }

    /// A recorder failure queued for the next poll; fetching it clears it.
    pub fn take_failure(&mut self) -> Option<String> {
        self.failure.take()
    }

    /// Observe one 4-byte write. Returns true when the caller must emit the
    /// single-mode hit ack (without `addr=`).
    pub fn on_write(
        &mut self,
        pc: u32,
        pr: u32,
        addr: u32,
        old: u32,
        new: u32,
        frame: u64,
    ) -> bool {
        match self.mode {
            WatchMode::Single { addr: watched } if addr == watched => {
                self.format_hit(pc, pr, addr, old, new, frame);
                self.append_hit_line();
                true
            }
            WatchMode::Range { lo, hi } if (lo..=hi).contains(&addr) => {
                self.format_hit(pc, pr, addr, old, new, frame);
                self.append_range_line();
                false
            }
            _ => false,
        }
    }

    fn format_hit(&mut self, pc: u32, pr: u32, addr: u32, old: u32, new: u32, frame: u64) {
        self.scratch.clear();
        let _ = writeln!(
            self.scratch,
            "pc=0x{pc:08x} pr=0x{pr:08x} addr=0x{addr:08x} old=0x{old:08x} new=0x{new:08x} frame={frame}"
        );
    }

    fn append_hit_line(&mut self) {
        if self.hits_file.is_none() {
            // Opened lazily on the first hit, append-only across arms.
            match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.hits_path)
            {
                Ok(f) => self.hits_file = Some(f),
                Err(e) => {
                    self.fail(e);
                    return;
                }
            }
        }
        if let Some(f) = self.hits_file.as_mut()
            && let Err(e) = f.write_all(self.scratch.as_bytes())
        {
            self.fail(e);
        }
    }

    fn append_range_line(&mut self) {
        if let Some(f) = self.range_file.as_mut()
            && let Err(e) = f.write_all(self.scratch.as_bytes())
        {
            self.fail(e);
        }
    }

    fn fail(&mut self, e: std::io::Error) {
        warn!(error = %e, "watchpoint log write failed, disarming");
        self.failure = Some(e.to_string());
        self.close();
    }
}
