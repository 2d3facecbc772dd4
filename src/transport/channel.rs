use super::{Transport, TransportConnector, TransportEvent};
use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::debug;

/// Frame sent by the client side of a channel transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Client side of an in-memory connection
#[derive(Debug)]
pub struct ChannelTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    open: bool,
}

/// Server side of an in-memory connection
#[derive(Debug)]
pub struct ServerEnd {
    url: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    frames: mpsc::UnboundedReceiver<OutboundFrame>,
}

/// Create a connected client/server pair
pub fn channel_pair(url: &str) -> (ChannelTransport, ServerEnd) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    let client = ChannelTransport {
        events: events_rx,
        outbound: frames_tx,
        open: true,
    };
    let server = ServerEnd {
        url: url.to_string(),
        events: events_tx,
        frames: frames_rx,
    };
    (client, server)
}

impl ChannelTransport {
    fn push(&self, frame: OutboundFrame) -> Result<()> {
        if !self.open {
            return Err(anyhow!("Transport is closed"));
        }
        self.outbound
            .send(frame)
            .map_err(|_| anyhow!("Server end dropped"))
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.push(OutboundFrame::Binary(data))
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.push(OutboundFrame::Text(text))
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if !self.open {
            return None;
        }
        match self.events.recv().await {
            Some(TransportEvent::Closed(reason)) => {
                self.open = false;
                Some(TransportEvent::Closed(reason))
            }
            Some(event) => Some(event),
            None => {
                self.open = false;
                Some(TransportEvent::Closed(None))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            if self.outbound.send(OutboundFrame::Close).is_err() {
                debug!("Server end already gone");
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl ServerEnd {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a text frame to the client; false if the client is gone
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.events
            .send(TransportEvent::Message(text.into()))
            .is_ok()
    }

    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send_text(value.to_string())
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.events.send(TransportEvent::Error(message.into())).is_ok()
    }

    pub fn close(&self, reason: Option<String>) -> bool {
        self.events.send(TransportEvent::Closed(reason)).is_ok()
    }

    /// Next frame sent by the client
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.frames.recv().await
    }

    pub fn try_recv(&mut self) -> Option<OutboundFrame> {
        self.frames.try_recv().ok()
    }

    /// Next text frame, skipping audio
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.frames.recv().await? {
                OutboundFrame::Text(text) => return Some(text),
                OutboundFrame::Binary(_) => continue,
                OutboundFrame::Close => return None,
            }
        }
    }
}

/// Connector that hands the server side of every connection to a receiver
#[derive(Debug, Clone)]
pub struct ChannelConnector {
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl ChannelConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { accepted: tx }, rx)
    }
}

#[async_trait::async_trait]
impl TransportConnector for ChannelConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        let (client, server) = channel_pair(url);
        self.accepted
            .send(server)
            .map_err(|_| anyhow!("No server is accepting connections"))?;
        Ok(Box::new(client))
    }
}
