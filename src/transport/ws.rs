use super::{Transport, TransportConnector, TransportEvent};
use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection to the transcription service
pub struct WsTransport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    open: bool,
}

impl WsTransport {
    /// Connect to the service
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to transcription service at {}", url);

        let (stream, _response) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        info!("Connected to transcription service");

        let (sink, stream) = stream.split();
        Ok(Self {
            sink,
            stream,
            open: true,
        })
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Binary(data))
            .await
            .context("Failed to send audio frame")
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .context("Failed to send control message")
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if !self.open {
            return None;
        }

        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    self.open = false;
                    return Some(TransportEvent::Error(e.to_string()));
                }
                None => {
                    self.open = false;
                    return Some(TransportEvent::Closed(None));
                }
            };

            match message {
                Message::Text(text) => return Some(TransportEvent::Message(text)),
                Message::Close(frame) => {
                    self.open = false;
                    let reason = frame.map(|f| format!("{} {}", f.code, f.reason));
                    return Some(TransportEvent::Closed(reason));
                }
                // Binary frames carry nothing for us; ping/pong is handled by tungstenite
                other => debug!("Ignoring websocket frame: {:?}", other),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.sink
            .close()
            .await
            .context("Failed to close websocket")
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Opens [`WsTransport`] connections
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait::async_trait]
impl TransportConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        let transport = WsTransport::connect(url).await?;
        Ok(Box::new(transport))
    }
}
