use super::{OutboundFrame, Transport, TransportEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Frames queued towards the writer before audio starts being dropped
pub const OUTBOUND_QUEUE: usize = 64;

/// Longest a single send may take before the connection counts as failed
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest the writer waits for the transport to close
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns a transport on its own task.
///
/// The controller only ever queues frames with `try_send`, so a socket that
/// stops draining can fill the queue but never block the caller. Send
/// failures and send timeouts come back as [`TransportEvent::Error`].
#[derive(Debug)]
pub struct TransportLink {
    outbound: mpsc::Sender<OutboundFrame>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportLink {
    pub fn spawn(transport: Box<dyn Transport>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(pump(transport, outbound_rx, events_tx));

        Self {
            outbound: outbound_tx,
            events: events_rx,
        }
    }

    /// Queue an audio frame. Returns false if it was dropped.
    pub fn try_send_audio(&self, data: Vec<u8>) -> bool {
        match self.outbound.try_send(OutboundFrame::Binary(data)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Outbound queue full, dropping audio frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Queue a control message
    pub fn send_text(&self, text: String) {
        if let Err(e) = self.outbound.try_send(OutboundFrame::Text(text)) {
            warn!("Failed to queue control message: {}", e);
        }
    }

    /// Next event from the connection; `None` once the writer has finished.
    ///
    /// Cancel-safe.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Ask the writer to close the transport. Returns immediately.
    pub fn close(self) {
        // A full queue still closes: the writer sees the sender drop
        let _ = self.outbound.try_send(OutboundFrame::Close);
    }
}

async fn pump(
    mut transport: Box<dyn Transport>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let sent = match frame {
                    Some(OutboundFrame::Binary(data)) => {
                        timeout(SEND_TIMEOUT, transport.send_binary(data)).await
                    }
                    Some(OutboundFrame::Text(text)) => {
                        timeout(SEND_TIMEOUT, transport.send_text(text)).await
                    }
                    Some(OutboundFrame::Close) | None => break,
                };

                let failure = match sent {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => format!("{:#}", e),
                    Err(_) => format!(
                        "Send did not complete within {} ms",
                        SEND_TIMEOUT.as_millis()
                    ),
                };
                warn!("Transport send failed: {}", failure);
                let _ = events.send(TransportEvent::Error(failure));
                break;
            }
            event = transport.next_event() => match event {
                Some(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    if transport.is_open() {
        match timeout(CLOSE_TIMEOUT, transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("{:#}", e),
            Err(_) => debug!("Transport did not close within {} ms", CLOSE_TIMEOUT.as_millis()),
        }
    }
    debug!("Transport writer finished");
}
