//! Protocol level types shared by the codecs, the connection and applications.
//!
//! - [`message`]: [`Message`] is either a request head or a payload item, with
//!   [`PayloadSize`] announcing how much body follows a head.
//! - [`RequestHeader`] and [`ResponseHead`]: request and response heads before a body
//!   is attached.
//! - [`body`]: [`ReqBody`](body::ReqBody), the request body handed to handlers,
//!   streamed from the connection on demand.
//! - [`multipart`]: [`Multipart`] pulls form fields out of any body.
//! - [`websocket`]: opcodes, frames and the events the frame decoder reports.
//! - [`error`]: one error enum per layer.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;
pub use response::status_response;

mod error;
pub use error::HandshakeError;
pub use error::HttpError;
pub use error::MultipartError;
pub use error::ParseError;
pub use error::SendError;
pub use error::WsError;

pub mod body;

pub mod multipart;
pub use multipart::{Multipart, MultipartField};

pub mod websocket;
pub use websocket::{OpCode, WsEvent, WsFrame, WsMessage};
