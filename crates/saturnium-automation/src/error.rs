use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Activation-time failures. Everything after activation is reported to the
/// orchestrator as an `error ...` ack instead; no error crosses a callback
/// boundary back into the emulator.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("failed to create automation directory {path}: {source}")]
    CreateBaseDir { path: PathBuf, source: io::Error },

    #[error("failed to write initial ack {path}: {source}")]
    WriteReady { path: PathBuf, source: io::Error },
}
