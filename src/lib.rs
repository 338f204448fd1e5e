//! Meeting Recorder - headless recording and live-streaming for virtual meetings.
//!
//! This crate is the session orchestration engine: it tracks recording
//! sessions, sequences the start/stop workflows across the capture backends
//! (browser-driven video, subprocess audio capture, subprocess stream relay),
//! and guarantees teardown on every failure path. An embedding service wires
//! it to an API surface and supplies the browser driver.

pub mod capture;
pub mod cleanup;
pub mod config;
pub mod recorder;
pub mod session;
pub mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for the embedding service.
///
/// Call once at startup. Respects `RUST_LOG` when set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Meeting Recorder v{}", env!("CARGO_PKG_VERSION"));
}
