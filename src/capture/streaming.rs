//! Live-stream relay adapter
//!
//! Pushes a session's capture to an external ingest URL (FLV over RTMP in
//! practice) through a supervised ffmpeg subprocess.

use crate::capture::process::{self, CommandSpec, ProcessHandle, ProcessLauncher};
use crate::capture::{CaptureError, CaptureResult};
use crate::config::Config;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Stream relay adapter
pub struct StreamRelay {
    config: Arc<Config>,
    launcher: Arc<dyn ProcessLauncher>,
    processes: Mutex<HashMap<Uuid, Box<dyn ProcessHandle>>>,
}

impl StreamRelay {
    pub fn new(config: Arc<Config>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            config,
            launcher,
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn the relay process pushing to `stream_url`. Fails fast if one is
    /// already running for this session.
    pub fn start(&self, session_id: Uuid, stream_url: &str) -> CaptureResult<()> {
        let mut processes = self.processes.lock();
        if processes.contains_key(&session_id) {
            return Err(CaptureError::AlreadyCapturing {
                backend: "streaming",
                session: session_id,
            });
        }

        tracing::info!("Starting stream to {}", stream_url);
        std::fs::create_dir_all(self.config.session_dir(session_id))?;

        let handle = self.launcher.launch(&relay_command(stream_url))?;
        processes.insert(session_id, handle);

        tracing::info!("Stream started for {}", session_id);
        Ok(())
    }

    /// Stop the session's relay process with the graceful-then-forced
    /// protocol. Resolves once the process has exited. No-op when no process
    /// is registered for the session.
    pub async fn stop(&self, session_id: Uuid) -> CaptureResult<()> {
        let handle = self.processes.lock().remove(&session_id);
        let Some(mut handle) = handle else {
            return Ok(());
        };

        process::shutdown(handle.as_mut(), self.config.process_grace).await?;
        tracing::info!("Stream stopped for {}", session_id);
        Ok(())
    }
}

fn relay_command(stream_url: &str) -> CommandSpec {
    CommandSpec::new(
        "ffmpeg",
        [
            "-f",
            "lavfi",
            "-i",
            "color=c=black:s=1280x720:d=21600",
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-b:v",
            "2000k",
            "-f",
            "flv",
            stream_url,
        ],
    )
}
