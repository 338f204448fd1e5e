//! Runtime configuration
//!
//! Loaded from environment variables with defaults suitable for local
//! development. The timeout knobs are plain fields so tests can shorten them.

use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the local meeting client the recording page navigates to
    pub client_url: String,

    /// Root directory for per-session recording artifacts
    pub recording_dir: PathBuf,

    /// Maximum lifetime of a session before the watchdog forces a stop
    pub max_session_duration: Duration,

    /// Whether to remove a session's artifacts shortly after a clean stop
    pub cleanup_after_stop: bool,

    /// How long to wait for the recording page to finish loading
    pub page_load_timeout: Duration,

    /// How long to wait for the client to report it joined the meeting
    pub join_timeout: Duration,

    /// Grace window between the polite termination signal and the forced kill
    pub process_grace: Duration,

    /// Delay before a scheduled post-stop cleanup runs
    pub cleanup_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_url: "http://localhost:5173".to_string(),
            recording_dir: PathBuf::from("/tmp/meeting-recordings"),
            max_session_duration: Duration::from_millis(21_600_000),
            cleanup_after_stop: false,
            page_load_timeout: Duration::from_secs(30),
            join_timeout: Duration::from_secs(15),
            process_grace: Duration::from_secs(5),
            cleanup_delay: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for unset or malformed values.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = env_var("LOCAL_CLIENT_URL") {
            config.client_url = url;
        }
        if let Some(dir) = env_var("TEMP_RECORDING_DIR") {
            config.recording_dir = PathBuf::from(dir);
        }
        if let Some(millis) = env_var("MAX_SESSION_DURATION").and_then(|v| v.parse::<u64>().ok()) {
            config.max_session_duration = Duration::from_millis(millis);
        }
        if let Some(flag) = env_var("CLEANUP_AFTER_STOP") {
            config.cleanup_after_stop = flag == "true";
        }

        config
    }

    /// Directory holding one session's artifacts.
    pub fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.recording_dir.join(session_id.to_string())
    }

    /// Root artifact directory.
    pub fn recording_root(&self) -> &Path {
        &self.recording_dir
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
