use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SessionRecord;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    /// Held only while the finished run is being packaged; the controller
    /// returns to `Idle` before `stop` returns.
    Finished,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub status: SessionState,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    /// Last run whose upload failed, kept for a manual retry.
    pub failed_upload: Option<(Uuid, SessionRecord)>,
}

impl ControllerState {
    pub fn begin_session(&mut self, session_id: Uuid, started_at: DateTime<Utc>) {
        self.status = SessionState::Running;
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
    }

    /// Back to `Idle`, keeping any failed upload around.
    pub fn finish(&mut self) {
        self.status = SessionState::Idle;
        self.session_id = None;
        self.started_at = None;
    }
}
