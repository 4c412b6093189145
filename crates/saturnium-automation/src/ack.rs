use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// Sequence-numbered response emission. Each call truncates the ack file and
/// writes exactly one message with ` cycle=<C> seq=<S>` appended; the
/// orchestrator reads the whole file and deduplicates by `seq`. Last writer
/// wins when hit acks interleave with command acks.
///
/// The scratch buffer is reused so the watchpoint storm path stays
/// allocation-free.
pub struct AckWriter {
    path: PathBuf,
    seq: u64,
    scratch: String,
}

impl AckWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            seq: 0,
            scratch: String::with_capacity(256),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Write one ack message. Returns the sequence number it carried. Safe
    /// to call from the frame tick, the dispatcher, the instruction hook,
    /// and the watchpoint callback; a failed write is logged and dropped
    /// (there is nowhere to report an ack failure to).
    pub fn write(&mut self, cycle: u64, msg: &str) -> u64 {
        if let Err(e) = self.write_checked(cycle, msg) {
            warn!(path = %self.path.display(), error = %e, "ack write failed");
        }
        self.seq
    }

    /// Like [`AckWriter::write`] but propagates the I/O failure; used at
    /// activation, where a missing ack file means the orchestrator can
    /// never see us.
    pub fn write_checked(&mut self, cycle: u64, msg: &str) -> std::io::Result<u64> {
        self.seq += 1;
        self.scratch.clear();
        let _ = writeln!(self.scratch, "{msg} cycle={cycle} seq={}", self.seq);
        fs::write(&self.path, self.scratch.as_bytes())?;
        Ok(self.seq)
    }
}
