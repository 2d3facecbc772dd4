//! Duplex connection to the transcription service
//!
//! - `ws`: WebSocket transport (tokio-tungstenite)
//! - `channel`: in-memory transport for embedding hosts and tests
//! - `link`: writer task that keeps a slow transport off the caller's path

pub mod channel;
pub mod link;
pub mod ws;

use anyhow::Result;

pub use channel::{ChannelConnector, ChannelTransport, OutboundFrame, ServerEnd};
pub use link::TransportLink;
pub use ws::{WsConnector, WsTransport};

/// Something that happened on the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text frame from the server
    Message(String),
    /// Connection-level failure
    Error(String),
    /// Connection closed, with the close reason when the peer gave one
    Closed(Option<String>),
}

/// An open connection to the transcription service
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Send a binary (audio) frame
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<()>;

    /// Send a text (control) frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Wait for the next event; `None` once the connection is finished.
    ///
    /// Must be cancel-safe: it is raced against other inputs.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Opens connections; a returned transport is already open
#[async_trait::async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>>;
}
