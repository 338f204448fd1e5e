//! Recording coordinator
//!
//! Sequences the capture backends through the session lifecycle and owns
//! every timer in the system. Workflows run their steps strictly in order;
//! races between an explicit stop and a watchdog-fired stop are made safe by
//! the adapters' defensive, idempotent stop operations rather than a
//! per-session lock.

use crate::capture::{
    AudioCapture, BrowserDriver, ProcessLauncher, StreamRelay, VideoCapture,
};
use crate::cleanup::CleanupManager;
use crate::config::Config;
use crate::session::{RecordingMode, Session, SessionPatch, SessionRegistry, SessionStatus};
use crate::utils::error::{Backend, RecorderError, RecorderResult};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A request to start recording and/or streaming a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Meeting to attach to
    pub meeting_id: String,

    /// User requesting the session
    pub user_id: String,

    /// Capture mode
    pub mode: RecordingMode,

    /// Ingest URL, required by the streaming modes
    pub stream_url: Option<String>,
}

/// Session summary with a live-computed duration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    #[serde(flatten)]
    pub session: Session,

    /// Seconds since start, frozen at the end time once the session stopped
    pub duration_secs: f64,
}

/// Top-level session orchestrator
pub struct Recorder {
    config: Arc<Config>,
    registry: SessionRegistry,
    video: VideoCapture,
    audio: AudioCapture,
    streaming: StreamRelay,
    cleanup: CleanupManager,

    /// One outstanding max-duration watchdog per active session
    watchdogs: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl Recorder {
    /// Build a recorder over the given driver and process launcher.
    pub fn new(
        config: Config,
        driver: Arc<dyn BrowserDriver>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        Arc::new(Self {
            registry: SessionRegistry::new(),
            video: VideoCapture::new(config.clone(), driver),
            audio: AudioCapture::new(config.clone(), launcher.clone()),
            streaming: StreamRelay::new(config.clone(), launcher),
            cleanup: CleanupManager::new(config.clone()),
            watchdogs: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// The session registry, for read-side queries by the embedding service.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start a recording session for a meeting.
    ///
    /// Validation happens before any session state is touched; a duplicate
    /// meeting surfaces before any backend is started. Any backend failure
    /// marks the session ERROR, tears down whatever was brought up, removes
    /// the session's artifacts, and re-raises.
    pub async fn start(self: &Arc<Self>, request: StartRequest) -> RecorderResult<Session> {
        let stream_url = match (&request.stream_url, request.mode.streams()) {
            (Some(url), true) => Some(url.clone()),
            (None, true) => {
                return Err(RecorderError::Validation(
                    "stream URL is required for streaming mode".into(),
                ))
            }
            (_, false) => None,
        };

        tracing::info!("Starting recording for meeting {}", request.meeting_id);

        let session = self.registry.create(
            &request.meeting_id,
            &request.user_id,
            request.mode,
            request.stream_url.clone(),
        )?;

        match self
            .run_start_sequence(&session, &request, stream_url.as_deref())
            .await
        {
            Ok(()) => {
                let session = self.registry.update(session.id, SessionPatch::Activated)?;
                self.arm_watchdog(session.id);
                tracing::info!("Recording started: {}", session.id);
                Ok(session)
            }
            Err(error) => {
                tracing::error!("Failed to start recording: {}", error);
                let _ = self.registry.update(
                    session.id,
                    SessionPatch::Failed {
                        error: error.to_string(),
                    },
                );
                self.abort_session(session.id).await;
                Err(error)
            }
        }
    }

    async fn run_start_sequence(
        &self,
        session: &Session,
        request: &StartRequest,
        stream_url: Option<&str>,
    ) -> RecorderResult<()> {
        self.video
            .start(session.id)
            .await
            .map_err(RecorderError::start(Backend::Video))?;

        if request.mode.records_audio() {
            self.audio
                .start(session.id)
                .map_err(RecorderError::start(Backend::Audio))?;
        }

        self.video
            .join(session.id, &request.meeting_id, &request.user_id)
            .await
            .map_err(RecorderError::start(Backend::Video))?;

        if let Some(url) = stream_url {
            self.streaming
                .start(session.id, url)
                .map_err(RecorderError::start(Backend::Streaming))?;
        }

        Ok(())
    }

    /// Stop a session, explicitly or on behalf of the watchdog.
    ///
    /// A backend failure marks the session ERROR and re-raises, but does not
    /// remove artifacts: a partially written recording is worth inspecting.
    pub async fn stop(&self, session_id: Uuid) -> RecorderResult<Session> {
        tracing::info!("Stopping recording: {}", session_id);

        let session = self.registry.get(session_id)?;
        self.registry.update(session_id, SessionPatch::Stopping)?;

        match self.run_stop_sequence(&session).await {
            Ok((video_path, audio_path)) => {
                let session = self.registry.update(
                    session_id,
                    SessionPatch::Stopped {
                        end_time: Utc::now(),
                        video_path,
                        audio_path,
                    },
                )?;
                self.cancel_watchdog(session_id);

                // TODO: hand the finished session (id, meeting id, video and
                // audio paths) to the merging service once its client lands.

                if self.config.cleanup_after_stop {
                    self.schedule_cleanup(session_id);
                }

                tracing::info!("Recording stopped: {}", session_id);
                Ok(session)
            }
            Err(error) => {
                tracing::error!("Failed to stop recording: {}", error);
                let _ = self.registry.update(
                    session_id,
                    SessionPatch::Failed {
                        error: error.to_string(),
                    },
                );
                Err(error)
            }
        }
    }

    async fn run_stop_sequence(
        &self,
        session: &Session,
    ) -> RecorderResult<(Option<PathBuf>, Option<PathBuf>)> {
        if session.mode.streams() {
            self.streaming
                .stop(session.id)
                .await
                .map_err(RecorderError::stop(Backend::Streaming))?;
        }

        if session.mode.records_audio() {
            self.audio
                .stop(session.id)
                .await
                .map_err(RecorderError::stop(Backend::Audio))?;
        }

        let video_path = self
            .video
            .stop(session.id)
            .await
            .map_err(RecorderError::stop(Backend::Video))?;

        let audio_path = Some(self.audio.audio_path(session.id));

        Ok((video_path, audio_path))
    }

    /// Session summary with the duration recomputed on every call.
    pub fn status(&self, session_id: Uuid) -> RecorderResult<StatusReport> {
        let session = self.registry.get(session_id)?;
        let duration_secs = session.duration_secs();
        Ok(StatusReport {
            session,
            duration_secs,
        })
    }

    /// Stop every active session and cancel all timers. Individual failures
    /// are logged; every active session is attempted regardless.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down recorder...");

        let timers: Vec<JoinHandle<()>> =
            self.watchdogs.lock().drain().map(|(_, task)| task).collect();
        for task in timers {
            task.abort();
        }

        for session in self.registry.sessions_in_status(SessionStatus::Active) {
            if let Err(error) = self.stop(session.id).await {
                tracing::error!(
                    "Failed to stop session {} on shutdown: {}",
                    session.id,
                    error
                );
            }
        }
    }

    /// Best-effort teardown after a failed start: defensively stop every
    /// backend (no-ops where nothing came up) and remove the artifacts.
    async fn abort_session(&self, session_id: Uuid) {
        if let Err(error) = self.streaming.stop(session_id).await {
            tracing::warn!("Stream teardown failed for {}: {}", session_id, error);
        }
        if let Err(error) = self.audio.stop(session_id).await {
            tracing::warn!("Audio teardown failed for {}: {}", session_id, error);
        }
        if let Err(error) = self.video.stop(session_id).await {
            tracing::warn!("Video teardown failed for {}: {}", session_id, error);
        }
        self.cleanup.cleanup_session(session_id);
    }

    fn arm_watchdog(self: &Arc<Self>, session_id: Uuid) {
        let recorder = Arc::clone(self);
        let max_duration = self.config.max_session_duration;

        let task = tokio::spawn(async move {
            tokio::time::sleep(max_duration).await;

            // Disarm before stopping, so the stop workflow's own timer
            // cancellation cannot abort this task mid-stop.
            recorder.watchdogs.lock().remove(&session_id);

            tracing::warn!("Max session duration exceeded for {}", session_id);
            if let Err(error) = recorder.stop(session_id).await {
                tracing::error!("Failed to auto-stop session {}: {}", session_id, error);
            }
        });

        self.watchdogs.lock().insert(session_id, task);
    }

    /// Idempotent: cancelling an already-cancelled or already-fired timer is
    /// a no-op.
    fn cancel_watchdog(&self, session_id: Uuid) {
        if let Some(task) = self.watchdogs.lock().remove(&session_id) {
            task.abort();
        }
    }

    fn schedule_cleanup(&self, session_id: Uuid) {
        let cleanup = self.cleanup.clone();
        let delay = self.config.cleanup_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cleanup.cleanup_session(session_id);
        });
    }
}
