//! Artifact cleanup
//!
//! Removes per-session recording directories, either for one session or as
//! an age-based sweep over the artifact root. Cleanup is strictly
//! best-effort: failures are logged and never propagated, so it can never be
//! the reason a start or stop workflow fails.

use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default age threshold for the periodic sweep
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Removes on-disk session artifacts
#[derive(Clone)]
pub struct CleanupManager {
    config: Arc<Config>,
}

impl CleanupManager {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Remove one session's artifact directory. A missing directory is fine.
    pub fn cleanup_session(&self, session_id: Uuid) {
        let session_dir = self.config.session_dir(session_id);
        if !session_dir.exists() {
            return;
        }

        match std::fs::remove_dir_all(&session_dir) {
            Ok(()) => tracing::info!("Cleaned up session directory: {}", session_id),
            Err(error) => {
                tracing::error!("Failed to cleanup session {}: {}", session_id, error)
            }
        }
    }

    /// Remove every session directory whose last modification is older than
    /// `max_age`. Meant to be driven by an external scheduler.
    pub fn cleanup_old_sessions(&self, max_age: Duration) {
        let root = self.config.recording_root();

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(_) if !root.exists() => return,
            Err(error) => {
                tracing::error!("Failed to scan recording directory: {}", error);
                return;
            }
        };

        for entry in entries.flatten() {
            let age = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());

            if age.is_some_and(|age| age > max_age) {
                match std::fs::remove_dir_all(entry.path()) {
                    Ok(()) => tracing::info!("Cleaned up old session: {:?}", entry.file_name()),
                    Err(error) => tracing::error!(
                        "Failed to cleanup old session {:?}: {}",
                        entry.file_name(),
                        error
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(tmp: &TempDir) -> CleanupManager {
        CleanupManager::new(Arc::new(Config {
            recording_dir: tmp.path().to_path_buf(),
            ..Config::default()
        }))
    }

    #[test]
    fn removes_session_directory() {
        let tmp = TempDir::new().unwrap();
        let cleanup = manager(&tmp);
        let session = Uuid::new_v4();
        let dir = tmp.path().join(session.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("audio.webm"), b"x").unwrap();

        cleanup.cleanup_session(session);
        assert!(!dir.exists());
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let cleanup = manager(&tmp);
        cleanup.cleanup_session(Uuid::new_v4());
    }

    #[test]
    fn sweep_removes_only_old_directories() {
        let tmp = TempDir::new().unwrap();
        let cleanup = manager(&tmp);

        let fresh = tmp.path().join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&fresh).unwrap();

        // Everything here was just created, so nothing is older than an hour.
        cleanup.cleanup_old_sessions(Duration::from_secs(3_600));
        assert!(fresh.exists());

        // With a zero threshold every directory qualifies.
        cleanup.cleanup_old_sessions(Duration::ZERO);
        assert!(!fresh.exists());
    }

    #[test]
    fn sweep_tolerates_missing_root() {
        let tmp = TempDir::new().unwrap();
        let cleanup = CleanupManager::new(Arc::new(Config {
            recording_dir: tmp.path().join("does-not-exist"),
            ..Config::default()
        }));
        cleanup.cleanup_old_sessions(DEFAULT_MAX_AGE);
    }
}
