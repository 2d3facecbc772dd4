use super::state::{RecordingMode, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time view of the dictation state, published to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current state machine status
    pub status: SessionStatus,

    /// Gesture mode of the live session, if any
    pub mode: Option<RecordingMode>,

    /// Identifier of the live session, if any
    pub session_id: Option<Uuid>,

    /// Text the host should currently show
    pub display_text: String,

    /// When the live session started
    pub started_at: Option<DateTime<Utc>>,

    /// When the last inbound message was received
    pub last_inbound_at: Option<DateTime<Utc>>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            mode: None,
            session_id: None,
            display_text: String::new(),
            started_at: None,
            last_inbound_at: None,
        }
    }
}
