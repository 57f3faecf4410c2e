use async_trait::async_trait;
use serde_json::Value;
use strand_http::protocol::{WsError, WsMessage};
use thiserror::Error;

use super::WsSession;

/// What went wrong on a WebSocket connection.
#[derive(Error, Debug)]
pub enum WsFailure {
    /// Fatal, the connection is closed after the handler saw it.
    #[error("websocket protocol error: {source}")]
    Protocol {
        #[from]
        source: WsError,
    },

    /// A text message in advanced mode was not a `{"event": ..., "data": ...}` object.
    /// Only that message is dropped.
    #[error("invalid structured message: {source}")]
    Structured {
        #[from]
        source: serde_json::Error,
    },

    /// A handler callback panicked while handling one message.
    #[error("websocket handler panicked: {message}")]
    Panic { message: String },
}

impl WsFailure {
    pub fn is_fatal(&self) -> bool {
        matches!(self, WsFailure::Protocol { .. })
    }
}

/// Application callbacks for one WebSocket endpoint.
///
/// The same handler serves every connection of its path; per connection state lives
/// in the [`WsSession`] handle or in the HTTP session behind it.
#[async_trait]
pub trait WsHandler: Send + Sync + 'static {
    /// Subprotocols this endpoint speaks, the first one offered by the client wins.
    fn protocols(&self) -> &[&str] {
        &[]
    }

    async fn on_open(&self, _session: &WsSession) {}

    /// Binary messages, and every message in raw mode.
    async fn on_message(&self, _session: &WsSession, _message: WsMessage) {}

    /// Structured text messages in advanced mode.
    async fn on_event(&self, _session: &WsSession, _event: &str, _data: Value) {}

    async fn on_error(&self, _session: &WsSession, _error: &WsFailure) {}

    async fn on_close(&self, _session: &WsSession) {}
}
