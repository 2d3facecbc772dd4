pub mod audio;
pub mod config;
pub mod protocol;
pub mod session;
pub mod signals;
pub mod transport;

pub use audio::{AudioCapture, AudioFile, AudioFrame, AudioSource, ChannelAudioSource, FileAudioSource};
pub use config::Config;
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{
    DictateEvent, DictationController, DictationHandle, DictationMachine, Effect, Gesture,
    RecordingMode, SessionConfig, SessionSnapshot, SessionStatus, TranscriptReconciler,
};
pub use signals::{ExternalSignal, SignalAdapter};
pub use transport::{ChannelConnector, Transport, TransportConnector, TransportEvent, WsConnector};
