use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Message received from the transcription service
///
/// Field types follow the loose JSON the service sends: text may be `null`,
/// `turn_order` may be any JSON number and `error` may be any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Provisional text for the utterance still being recognized
    InterimTranscript {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// Recognizer-confirmed text for a turn
    Transcript {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Missing turn order is treated as turn 0; fractions are floored
        #[serde(
            default,
            deserialize_with = "turn_order_from_number",
            skip_serializing_if = "Option::is_none"
        )]
        turn_order: Option<i64>,
    },

    /// Liveness ping, carries no payload
    Heartbeat,

    /// The server ended the session on its side
    SessionClosed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Server-reported failure
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },

    /// Any message type this client does not know about
    #[serde(other)]
    Unknown,
}

fn turn_order_from_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    })
}

impl ServerMessage {
    /// Parse a JSON text frame
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Type tag as it appears on the wire (for logging)
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::InterimTranscript { .. } => "interim_transcript",
            ServerMessage::Transcript { .. } => "transcript",
            ServerMessage::Heartbeat => "heartbeat",
            ServerMessage::SessionClosed { .. } => "session_closed",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Unknown => "unknown",
        }
    }

    /// Error detail as display text; strings are used as is, other JSON
    /// values are rendered compactly. `None` when the server sent nothing.
    pub fn error_text(&self) -> Option<String> {
        match self {
            ServerMessage::Error { error } => match error {
                None | Some(Value::Null) => None,
                Some(Value::String(text)) => Some(text.clone()),
                Some(other) => Some(other.to_string()),
            },
            _ => None,
        }
    }
}

/// Control message sent to the transcription service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the server to finalize outstanding results and end the session
    Close,
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        match self {
            ClientMessage::Close => r#"{"type":"close"}"#.to_string(),
        }
    }
}
