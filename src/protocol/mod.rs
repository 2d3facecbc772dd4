//! Wire format spoken with the transcription service
//!
//! Inbound frames are JSON objects tagged by `type`; outbound control frames
//! use the same convention. Audio travels separately as binary frames.

pub mod messages;

pub use messages::{ClientMessage, ServerMessage};
