use super::transcript::TranscriptReconciler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of the dictation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Active,
    Finalizing,
    Error,
}

/// Which gesture started the session, and therefore which one may stop it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordingMode {
    ShortTap,
    LongPress,
}

/// User gesture on the dictation control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    ShortTap,
    LongPressStart,
    LongPressEnd,
}

/// A single live dictation attempt
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub mode: RecordingMode,
    pub transcript: TranscriptReconciler,
    /// Transport connected for this session
    pub channel_open: bool,
    /// Interim text captured when stop was requested
    pub interim_at_stop: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_inbound_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(mode: RecordingMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            transcript: TranscriptReconciler::new(),
            channel_open: false,
            interim_at_stop: None,
            started_at: Utc::now(),
            last_inbound_at: None,
        }
    }

    /// Text delivered with `dictate-end`: the finalized transcript, or the
    /// given interim when no final result ever arrived.
    pub fn end_text(&self, fallback_interim: &str) -> String {
        let finalized = self.transcript.finalized_text();
        if finalized.is_empty() {
            fallback_interim.to_string()
        } else {
            finalized
        }
    }
}
