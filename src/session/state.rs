//! Session state types
//!
//! Defines the session record, its lifecycle statuses, and the closed set of
//! transition patches the registry accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What a session captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Record audio and video to disk
    Record,
    /// Relay a live stream only
    Stream,
    /// Record to disk and relay a live stream
    RecordStream,
}

impl RecordingMode {
    /// Whether this mode captures audio alongside the browser video.
    pub fn records_audio(&self) -> bool {
        matches!(self, Self::Record | Self::RecordStream)
    }

    /// Whether this mode relays a live stream.
    pub fn streams(&self) -> bool {
        matches!(self, Self::Stream | Self::RecordStream)
    }
}

/// Lifecycle status of a session
///
/// STARTING and STOPPING are transient; STOPPED and ERROR are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Starting,
    Active,
    Stopping,
    Stopped,
    Error,
}

impl SessionStatus {
    /// Terminal statuses receive no further automatic transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }
}

/// One recording/streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Globally unique session identifier
    pub id: Uuid,

    /// Meeting this session is bound to
    pub meeting_id: String,

    /// User who requested the session
    pub user_id: String,

    /// Capture mode
    pub mode: RecordingMode,

    /// Current lifecycle status
    pub status: SessionStatus,

    /// Target URL when the mode relays a stream
    pub stream_url: Option<String>,

    /// When the session was created
    pub start_time: DateTime<Utc>,

    /// When the session stopped, once it has
    pub end_time: Option<DateTime<Utc>>,

    /// Recorded video file, resolved at stop time
    pub video_path: Option<PathBuf>,

    /// Recorded audio file, resolved at stop time
    pub audio_path: Option<PathBuf>,

    /// Failure message, once one occurred
    pub error: Option<String>,
}

impl Session {
    pub(crate) fn new(
        meeting_id: String,
        user_id: String,
        mode: RecordingMode,
        stream_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            meeting_id,
            user_id,
            mode,
            status: SessionStatus::Starting,
            stream_url,
            start_time: Utc::now(),
            end_time: None,
            video_path: None,
            audio_path: None,
            error: None,
        }
    }

    /// Seconds elapsed between start and end time, or until now while the
    /// session is still running. Computed fresh on every call.
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// A lifecycle transition applied through the registry
///
/// Each variant carries exactly the fields its transition is allowed to
/// touch, so an illegal partial state cannot be constructed.
#[derive(Debug, Clone)]
pub enum SessionPatch {
    /// All backends started; the session is live
    Activated,
    /// A stop workflow has begun
    Stopping,
    /// The stop workflow completed
    Stopped {
        end_time: DateTime<Utc>,
        video_path: Option<PathBuf>,
        audio_path: Option<PathBuf>,
    },
    /// A start or stop workflow failed
    Failed { error: String },
}

impl SessionPatch {
    /// Merge this patch into the session. Last writer wins on the fields the
    /// variant names; everything else is untouched.
    pub(crate) fn apply(self, session: &mut Session) {
        match self {
            SessionPatch::Activated => {
                session.status = SessionStatus::Active;
            }
            SessionPatch::Stopping => {
                session.status = SessionStatus::Stopping;
            }
            SessionPatch::Stopped {
                end_time,
                video_path,
                audio_path,
            } => {
                session.status = SessionStatus::Stopped;
                session.end_time = Some(end_time);
                session.video_path = video_path;
                session.audio_path = audio_path;
            }
            SessionPatch::Failed { error } => {
                session.status = SessionStatus::Error;
                session.error = Some(error);
            }
        }
    }
}
