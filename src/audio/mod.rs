pub mod backend;
pub mod channel;
pub mod file;
pub mod level;
pub mod pcm;

pub use backend::{AudioCapture, AudioFrame, AudioSource};
pub use channel::ChannelAudioSource;
pub use file::{AudioFile, FileAudioSource};
pub use level::LevelMeter;
