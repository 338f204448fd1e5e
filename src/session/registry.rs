//! Session registry
//!
//! Authoritative in-memory store of every session plus the meeting index
//! that enforces session uniqueness per meeting. Both maps live behind one
//! lock so creation is a single check-and-insert step.

use crate::session::state::{RecordingMode, Session, SessionPatch, SessionStatus};
use crate::utils::error::{RecorderError, RecorderResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<Uuid, Session>,
    by_meeting: HashMap<String, Uuid>,
}

/// Owns the canonical session records. Other components receive clones and
/// make targeted updates through [`SessionRegistry::update`].
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a meeting.
    ///
    /// Fails with `DuplicateSession` while the meeting's indexed session is
    /// still non-terminal. A stopped or errored predecessor is superseded in
    /// the index; its record stays until deleted.
    pub fn create(
        &self,
        meeting_id: &str,
        user_id: &str,
        mode: RecordingMode,
        stream_url: Option<String>,
    ) -> RecorderResult<Session> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.by_meeting.get(meeting_id) {
            let still_running = inner
                .sessions
                .get(existing)
                .is_some_and(|s| !s.status.is_terminal());
            if still_running {
                return Err(RecorderError::DuplicateSession(meeting_id.to_string()));
            }
        }

        let session = Session::new(
            meeting_id.to_string(),
            user_id.to_string(),
            mode,
            stream_url,
        );
        inner.by_meeting.insert(meeting_id.to_string(), session.id);
        inner.sessions.insert(session.id, session.clone());

        Ok(session)
    }

    /// Fetch a copy of a session.
    pub fn get(&self, session_id: Uuid) -> RecorderResult<Session> {
        self.inner
            .lock()
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(RecorderError::SessionNotFound(session_id))
    }

    /// Apply a lifecycle patch and return the updated record.
    pub fn update(&self, session_id: Uuid, patch: SessionPatch) -> RecorderResult<Session> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(RecorderError::SessionNotFound(session_id))?;
        patch.apply(session);
        Ok(session.clone())
    }

    /// Remove a session and its meeting index entry. This is the purge
    /// operation; terminal sessions persist until it is called.
    pub fn delete(&self, session_id: Uuid) -> RecorderResult<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .remove(&session_id)
            .ok_or(RecorderError::SessionNotFound(session_id))?;
        // Only unlink the index if it still points at this session; a newer
        // session may have superseded a terminal one.
        if inner.by_meeting.get(&session.meeting_id) == Some(&session_id) {
            inner.by_meeting.remove(&session.meeting_id);
        }
        Ok(())
    }

    /// Non-throwing lookup by meeting.
    pub fn get_by_meeting(&self, meeting_id: &str) -> Option<Session> {
        let inner = self.inner.lock();
        let id = inner.by_meeting.get(meeting_id)?;
        inner.sessions.get(id).cloned()
    }

    /// Whether the meeting's indexed session is currently ACTIVE.
    pub fn is_session_active(&self, meeting_id: &str) -> bool {
        self.get_by_meeting(meeting_id)
            .is_some_and(|s| s.status == SessionStatus::Active)
    }

    /// Snapshot of all sessions currently in the given status.
    pub fn sessions_in_status(&self, status: SessionStatus) -> Vec<Session> {
        self.inner
            .lock()
            .sessions
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect()
    }
}
