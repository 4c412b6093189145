//! File-based debug and automation control plane for a Saturn emulator.
//!
//! An external orchestrator (usually on another host across a filesystem
//! bridge) drives the emulator by writing one command batch to
//! `<base>/mednafen_action.txt`; the plane executes the commands against the
//! emulator and answers through `<base>/mednafen_ack.txt`, one
//! sequence-numbered message at a time. On top of the request/response files
//! it can pause the machine between frames or between single instructions,
//! match PC breakpoints, observe memory writes on both the CPU store path
//! and the SCU-DMA path, record binary and textual execution traces, take
//! queued screenshots, and inject pad input.
//!
//! The whole plane runs on the emulator thread: the emulator calls
//! [`Automation::frame_tick`] once per frame, [`Automation::on_instruction`]
//! per master-CPU instruction while the hook is armed, and the write/call/CD
//! callbacks from the corresponding bus paths. There are no background
//! threads and no locks; both pause levels are sleep-and-poll loops inside
//! those callbacks.

pub mod ack;
pub mod command;
pub mod config;
pub mod error;
pub mod input;
pub mod plane;
pub mod snapshot;
pub mod trace;
pub mod watcher;
pub mod watchpoint;

pub use config::{AutomationConfig, ScreenshotEncoder};
pub use error::AutomationError;
pub use plane::{Automation, FrameMode, StepState};
