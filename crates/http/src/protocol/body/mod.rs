//! Request body streaming.
//!
//! - [`ReqBody`]: the consumer side, implements `http_body::Body`
//! - [`ReqBodySender`]: the producer side, reads payload items from the connection
//!
//! The two halves talk through a one-slot request channel: a chunk is read from the
//! socket only after the consumer asked for it. Whatever the handler leaves unread is
//! drained by [`ReqBodySender::skip_body`] before the next request is decoded.

mod req_body;

pub use req_body::ReqBody;
pub use req_body::ReqBodySender;
