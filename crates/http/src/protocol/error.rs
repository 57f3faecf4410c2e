use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("unsupported transfer-encoding: {encoding}")]
    UnsupportedTransferEncoding { encoding: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { encoding: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while splitting a multipart/form-data body into fields.
///
/// Every variant except [`MultipartError::Body`] and [`MultipartError::Io`] moves the
/// decoder into its terminal failed state.
#[derive(Error, Debug)]
pub enum MultipartError {
    #[error("No boundary found for multipart parser")]
    NoBoundary,

    #[error("invalid multipart boundary: {reason}")]
    InvalidBoundary { reason: String },

    #[error("Unexpected boundary symbol found")]
    UnexpectedBoundarySymbol,

    #[error("No header name delimiter found")]
    NoHeaderDelimiter,

    #[error("Invalid header received")]
    InvalidHeader,

    #[error("Invalid content disposition structure")]
    InvalidContentDisposition,

    #[error("part header line exceed the limit {max_size}")]
    HeaderTooLarge { max_size: usize },

    #[error("Invalid multipart request ending")]
    InvalidRequestEnding,

    #[error("Unexpected end of multipart data")]
    UnexpectedEnd,

    #[error("multipart data received after the closing boundary")]
    AlreadyFinished,

    #[error("multipart parser has failed, no more data is accepted")]
    Failed,

    #[error("read multipart body error: {reason}")]
    Body { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl MultipartError {
    pub fn invalid_boundary<S: ToString>(str: S) -> Self {
        Self::InvalidBoundary { reason: str.to_string() }
    }

    pub fn body<S: ToString>(str: S) -> Self {
        Self::Body { reason: str.to_string() }
    }
}

/// Errors raised by the WebSocket frame decoder and handshake validation.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("WebSocket extensions are not supported")]
    ExtensionsUnsupported,

    #[error("unknown WebSocket opcode {0:#x}")]
    UnknownOpcode(u8),

    #[error("WebSocket control frame must be final and at most 125 bytes long")]
    InvalidControlFrame,

    #[error("WebSocket frame from client is not masked")]
    UnmaskedFrame,

    #[error("WebSocket continuation frame without a message in progress")]
    UnexpectedContinuation,

    #[error("WebSocket data frame interleaved with an unfinished message")]
    InterleavedMessage,

    #[error("WebSocket frame length above 4GB is not supported")]
    PayloadTooLarge,

    #[error("Too big WebSocket message")]
    MessageTooBig { limit: usize },

    #[error("WebSocket text message is not valid utf-8")]
    InvalidUtf8,

    #[error("WebSocket decoder has failed, no more data is accepted")]
    Failed,

    #[error("handshake error: {source}")]
    Handshake {
        #[from]
        source: HandshakeError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Reasons for refusing a WebSocket upgrade request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("missing or invalid upgrade header")]
    NotWebSocket,

    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,

    #[error("unsupported Sec-WebSocket-Version, only 13 is accepted")]
    UnsupportedVersion,

    #[error("origin {origin} is not allowed")]
    OriginNotAllowed { origin: String },
}
