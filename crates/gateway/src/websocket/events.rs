//! Frames exchanged over a conversation stream

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::rest::EnvelopeResponse;

/// Client events received from WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Heartbeat to keep connection alive
    Ping,
    /// Submit an envelope to the streamed conversation
    Send { sender: Uuid, body: String },
    /// Leave the stream; the server closes the socket afterwards
    Unsubscribe,
}

/// Server events sent to WebSocket clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Subscribed {
        conversation_id: Uuid,
        subscription: String,
    },
    Envelope {
        envelope: EnvelopeResponse,
    },
    /// Acknowledges a `send` once the envelope is persisted
    Sent {
        envelope_id: Uuid,
    },
    Unsubscribed {
        conversation_id: Uuid,
    },
    Pong,
    Error {
        error: String,
        message: String,
    },
}

impl From<&GatewayError> for ServerEvent {
    fn from(error: &GatewayError) -> Self {
        ServerEvent::Error {
            error: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
