use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use saturnium_machine::FrameView;

/// Request file written by the orchestrator.
pub const ACTION_FILE: &str = "mednafen_action.txt";
/// Response file, truncated and rewritten one message at a time.
pub const ACK_FILE: &str = "mednafen_ack.txt";
/// Append-only log of single-address watchpoint hits.
pub const WATCHPOINT_LOG_FILE: &str = "watchpoint_hits.txt";

/// Screenshot encoder supplied by the host. PNG encoding stays outside the
/// control plane; the plane only queues the path and hands over a
/// framebuffer view on the next frame tick.
pub type ScreenshotEncoder =
    Box<dyn FnMut(&FrameView<'_>, &Path) -> Result<(), Box<dyn Error>> + Send>;

/// Activation parameters for the control plane.
pub struct AutomationConfig {
    /// Directory holding the action/ack/watchpoint files.
    pub base_dir: PathBuf,
    /// Sleep between action-file polls inside the two pause loops.
    pub poll_interval: Duration,
    pub encoder: ScreenshotEncoder,
}

impl AutomationConfig {
    pub fn new(base_dir: impl Into<PathBuf>, encoder: ScreenshotEncoder) -> Self {
        Self {
            base_dir: base_dir.into(),
            poll_interval: Duration::from_millis(10),
            encoder,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub(crate) fn action_path(&self) -> PathBuf {
        self.base_dir.join(ACTION_FILE)
    }

    pub(crate) fn ack_path(&self) -> PathBuf {
        self.base_dir.join(ACK_FILE)
    }

    pub(crate) fn watchpoint_log_path(&self) -> PathBuf {
        self.base_dir.join(WATCHPOINT_LOG_FILE)
    }
}
