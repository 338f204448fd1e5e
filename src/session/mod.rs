//! Session model and registry
//!
//! A session is one recording/streaming attempt bound to exactly one meeting.
//! The registry is the authoritative in-memory record of every session and
//! enforces at-most-one non-terminal session per meeting.

pub mod registry;
pub mod state;

pub use registry::SessionRegistry;
pub use state::{RecordingMode, Session, SessionPatch, SessionStatus};
