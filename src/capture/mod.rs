//! Capture backends
//!
//! Each backend wraps one external capture mechanism behind a uniform
//! start/stop contract:
//! - `VideoCapture` drives a recording browser context via a `BrowserDriver`
//! - `AudioCapture` supervises an audio-capture subprocess
//! - `StreamRelay` supervises a live-stream relay subprocess
//!
//! Subprocess-backed adapters stop with a graceful-then-forced protocol and
//! only report completion once the process has actually exited.

pub mod audio;
pub mod browser;
pub mod process;
pub mod streaming;

use thiserror::Error;
use uuid::Uuid;

pub use audio::AudioCapture;
pub use browser::{BrowserDriver, ContextId, PageId, VideoCapture};
pub use process::{CommandSpec, ProcessHandle, ProcessLauncher, SystemLauncher};
pub use streaming::StreamRelay;

/// Errors raised by capture backends
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("{backend} capture already running for session {session}")]
    AlreadyCapturing {
        backend: &'static str,
        session: Uuid,
    },

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: &'static str, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;
