use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use tungstenite::protocol::Message as WsMessage;

use crate::timer::Snapshot;
use crate::utils::TimerError;

/// Frames a WebSocket client may send.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "timerId", default)]
        timer_id: String,
    },
    Start {
        #[serde(rename = "timerId", default)]
        timer_id: String,
        #[serde(default)]
        duration: Value,
    },
    Reset {
        #[serde(rename = "timerId", default)]
        timer_id: String,
    },
}

/// Frames the server sends over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Update {
        #[serde(rename = "timerId")]
        timer_id: String,
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    Ack {
        #[serde(rename = "timerId")]
        timer_id: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn to_frame(&self) -> WsMessage {
        match serde_json::to_string(self) {
            Ok(json) => WsMessage::text(json),
            Err(e) => {
                warn!("Failed to serialize server message: {e}");
                WsMessage::text(r#"{"type":"error","message":"internal error"}"#)
            }
        }
    }
}

impl From<TimerError> for ServerMessage {
    fn from(err: TimerError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }
}

/// Body of `POST /api/timers/start`.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(rename = "timerId", default)]
    pub timer_id: Option<String>,
    #[serde(default)]
    pub duration: Value,
}

/// Body of `POST /api/timers/reset`.
#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(rename = "timerId", default)]
    pub timer_id: Option<String>,
}

/// Query string of the routes that read a timer.
#[derive(Debug, Default, Deserialize)]
pub struct TimerQuery {
    #[serde(rename = "timerId", default)]
    pub timer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
