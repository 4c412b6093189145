use std::fs;
use std::path::PathBuf;

use tracing::debug;

/// Change detection for the action file.
///
/// `stat(2)` mtime only has second-level resolution over the filesystem
/// bridge, so rapid command batches would be missed by time-based checks.
/// The watcher instead reads the whole file on every poll and latches the
/// first line, a required header of the form `# <decimal-seq><padding>`.
/// A batch is dispatched exactly when the header is not byte-identical to
/// the previously accepted one; padding changes alone count as new.
pub struct ActionWatcher {
    path: PathBuf,
    last_header: Option<String>,
}

impl ActionWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_header: None,
        }
    }

    /// Poll once. Returns the command lines of a freshly accepted batch,
    /// already stripped of `\r`, blank lines, and `#` comments.
    pub fn poll(&mut self) -> Option<Vec<String>> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let mut lines = raw.lines();
        let header = lines.next()?;
        if !is_header(header) {
            return None;
        }
        if self.last_header.as_deref() == Some(header) {
            return None;
        }
        debug!(header, "action batch accepted");
        self.last_header = Some(header.to_string());
        let commands: Vec<String> = lines
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        Some(commands)
    }
}

/// `# <decimal-seq>` with optional trailing whitespace padding.
fn is_header(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('#') else {
        return false;
    };
    let rest = rest.trim_start();
    let digits = rest.trim_end();
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
