//! Audio capture adapter
//!
//! Records system audio for a session into `<session dir>/audio.webm` via a
//! supervised ffmpeg subprocess (PulseAudio source, Opus in WebM).

use crate::capture::process::{self, CommandSpec, ProcessHandle, ProcessLauncher};
use crate::capture::{CaptureError, CaptureResult};
use crate::config::Config;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Fixed audio artifact name within the session directory
const AUDIO_FILE_NAME: &str = "audio.webm";

/// Hard cap passed to the encoder so a runaway process cannot record forever
const MAX_CAPTURE_SECS: u32 = 21_600;

/// Audio capture adapter
pub struct AudioCapture {
    config: Arc<Config>,
    launcher: Arc<dyn ProcessLauncher>,
    processes: Mutex<HashMap<Uuid, Box<dyn ProcessHandle>>>,
}

impl AudioCapture {
    pub fn new(config: Arc<Config>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            config,
            launcher,
            processes: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn the capture process for a session. Fails fast if one is
    /// already running for this session.
    pub fn start(&self, session_id: Uuid) -> CaptureResult<PathBuf> {
        let mut processes = self.processes.lock();
        if processes.contains_key(&session_id) {
            return Err(CaptureError::AlreadyCapturing {
                backend: "audio",
                session: session_id,
            });
        }

        let audio_path = self.audio_path(session_id);
        std::fs::create_dir_all(self.config.session_dir(session_id))?;

        let spec = capture_command(&audio_path);
        let handle = self.launcher.launch(&spec)?;
        processes.insert(session_id, handle);

        tracing::info!("Audio capture started: {}", session_id);
        Ok(audio_path)
    }

    /// Stop the session's capture process, escalating to a forced kill if it
    /// ignores the graceful signal. Resolves once the process has exited.
    /// No-op when no process is registered for the session.
    pub async fn stop(&self, session_id: Uuid) -> CaptureResult<()> {
        let handle = self.processes.lock().remove(&session_id);
        let Some(mut handle) = handle else {
            return Ok(());
        };

        process::shutdown(handle.as_mut(), self.config.process_grace).await?;
        tracing::info!("Audio capture stopped: {}", session_id);
        Ok(())
    }

    /// Where the session's audio lands. Pure path resolution, independent of
    /// whether a process is (or ever was) running.
    pub fn audio_path(&self, session_id: Uuid) -> PathBuf {
        self.config.session_dir(session_id).join(AUDIO_FILE_NAME)
    }
}

fn capture_command(output_path: &std::path::Path) -> CommandSpec {
    CommandSpec::new(
        "ffmpeg",
        [
            "-f".to_string(),
            "pulse".to_string(),
            "-i".to_string(),
            "default".to_string(),
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            "-t".to_string(),
            MAX_CAPTURE_SECS.to_string(),
            output_path.to_string_lossy().to_string(),
        ],
    )
}
