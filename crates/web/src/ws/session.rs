use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use strand_http::protocol::{WsFrame, WsMessage};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::connection::Connection;

#[derive(Error, Debug)]
pub enum WsSendError {
    #[error("websocket connection is closed")]
    Closed,

    #[error("serialize event error: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Serialize)]
struct OutgoingEvent<'a, T> {
    event: &'a str,
    data: T,
}

/// Handle to one WebSocket connection.
///
/// Clones share the connection. Frames are queued on a bounded channel and written by
/// the connection task in order, sending waits while the queue is full.
#[derive(Debug, Clone)]
pub struct WsSession {
    connection: Arc<Connection>,
    protocol: Option<String>,
    outbound: mpsc::Sender<WsFrame>,
}

impl WsSession {
    pub(crate) fn new(connection: Arc<Connection>, protocol: Option<String>, outbound: mpsc::Sender<WsFrame>) -> Self {
        Self { connection, protocol, outbound }
    }

    /// The upgrade request, with its cookies and session.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The negotiated subprotocol.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub async fn send(&self, message: WsMessage) -> Result<(), WsSendError> {
        self.send_frame(WsFrame::from(message)).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), WsSendError> {
        self.send_frame(WsFrame::text(text)).await
    }

    pub async fn send_binary(&self, data: impl Into<Bytes>) -> Result<(), WsSendError> {
        self.send_frame(WsFrame::binary(data)).await
    }

    /// Sends `{"event": <event>, "data": <data>}` as a text message.
    pub async fn send_event<T: Serialize>(&self, event: &str, data: T) -> Result<(), WsSendError> {
        let text = serde_json::to_string(&OutgoingEvent { event, data })?;
        self.send_text(text).await
    }

    /// Writes a close frame, the connection ends once it is on the wire.
    pub async fn close(&self) -> Result<(), WsSendError> {
        self.send_frame(WsFrame::Close).await
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    async fn send_frame(&self, frame: WsFrame) -> Result<(), WsSendError> {
        self.outbound.send(frame).await.map_err(|_| WsSendError::Closed)
    }
}
