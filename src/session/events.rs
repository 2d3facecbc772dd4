use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Public events delivered to the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail")]
pub enum DictateEvent {
    #[serde(rename = "dictate-start")]
    Start,
    #[serde(rename = "dictate-text")]
    Text(String),
    #[serde(rename = "dictate-error")]
    Error(String),
    #[serde(rename = "dictate-end")]
    End(String),
}

impl DictateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DictateEvent::Start => "dictate-start",
            DictateEvent::Text(_) => "dictate-text",
            DictateEvent::Error(_) => "dictate-error",
            DictateEvent::End(_) => "dictate-end",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            DictateEvent::Start => None,
            DictateEvent::Text(detail)
            | DictateEvent::Error(detail)
            | DictateEvent::End(detail) => Some(detail),
        }
    }
}

/// Where the state machine delivers its public events
pub trait EventSink {
    fn emit(&mut self, event: DictateEvent);
}

impl EventSink for Vec<DictateEvent> {
    fn emit(&mut self, event: DictateEvent) {
        self.push(event);
    }
}

/// Forwards events to an unbounded channel read by the host
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DictateEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DictateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: DictateEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}
