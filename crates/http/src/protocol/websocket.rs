//! WebSocket message model shared by the frame codec and the application layer.

use bytes::Bytes;

/// Frame opcodes defined by RFC 6455.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl OpCode {
    /// Control frames carry at most 125 bytes and can't be fragmented.
    #[inline]
    pub fn is_control(self) -> bool {
        (self as u8) & 0x8 != 0
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(other),
        }
    }
}

/// A complete, reassembled data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Bytes),
}

impl WsMessage {
    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WsMessage::Text(text) => text.as_bytes(),
            WsMessage::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// What the frame decoder reports to the connection.
///
/// Pong frames are consumed silently and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    Message(WsMessage),
    Ping(Bytes),
    Close,
}

/// A frame written by the server. Server frames are never masked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsFrame {
    Text(Bytes),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close,
}

impl WsFrame {
    pub fn text(text: impl Into<String>) -> Self {
        WsFrame::Text(Bytes::from(text.into()))
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        WsFrame::Binary(data.into())
    }

    /// The empty ping sent to idle clients.
    pub fn keep_alive() -> Self {
        WsFrame::Ping(Bytes::new())
    }

    pub fn opcode(&self) -> OpCode {
        match self {
            WsFrame::Text(_) => OpCode::Text,
            WsFrame::Binary(_) => OpCode::Binary,
            WsFrame::Ping(_) => OpCode::Ping,
            WsFrame::Pong(_) => OpCode::Pong,
            WsFrame::Close => OpCode::Close,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            WsFrame::Text(bytes) | WsFrame::Binary(bytes) | WsFrame::Ping(bytes) | WsFrame::Pong(bytes) => bytes,
            WsFrame::Close => &[],
        }
    }
}

impl From<WsMessage> for WsFrame {
    fn from(message: WsMessage) -> Self {
        match message {
            WsMessage::Text(text) => WsFrame::text(text),
            WsMessage::Binary(bytes) => WsFrame::Binary(bytes),
        }
    }
}
