//! Recording orchestration
//!
//! The `Recorder` is the top-level coordinator: it mints sessions through
//! the registry, sequences the capture backends through the start/stop
//! workflows, arms a max-duration watchdog per session, and drains every
//! active session on shutdown.

pub mod coordinator;

pub use coordinator::{Recorder, StartRequest, StatusReport};
