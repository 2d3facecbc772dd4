//! Dictation session management
//!
//! This module provides the session core:
//! - Transcript reconciliation across turns and refinements
//! - Connection-liveness monitoring (heartbeat timeout)
//! - The session state machine (`DictationMachine`)
//! - The async driver that wires it to audio and transport (`DictationController`)

mod config;
mod controller;
mod events;
mod gesture;
mod heartbeat;
mod machine;
mod state;
mod stats;
mod timer;
mod transcript;

pub use config::{SessionConfig, DEFAULT_ENDPOINT, DEFAULT_LANGUAGE};
pub use controller::{ControlInput, DictationController, DictationHandle, PointerInput};
pub use events::{ChannelSink, DictateEvent, EventSink};
pub use gesture::PressClassifier;
pub use heartbeat::HeartbeatMonitor;
pub use machine::{
    DictationMachine, Effect, CONNECTION_ERROR, CONNECTION_LOST, SERVER_ERROR, STARTUP_FAILED,
};
pub use state::{Gesture, RecordingMode, Session, SessionStatus};
pub use stats::SessionSnapshot;
pub use timer::Deadline;
pub use transcript::TranscriptReconciler;
