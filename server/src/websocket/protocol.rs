//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.

use serde::{Deserialize, Serialize};
use tote_engine::CollectionPath;

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One of the user's collections was written; clients should re-read it.
    Changed { root: String, subcollection: String },

    /// Response to ping.
    Pong,

    /// Error message.
    Error { message: String },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Change notification for a collection.
    pub fn changed(path: &CollectionPath) -> Self {
        ServerMessage::Changed {
            root: path.root.clone(),
            subcollection: path.subcollection.clone(),
        }
    }
}
