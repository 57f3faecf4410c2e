//! The HTTP/1.1 request loop.
//!
//! [`HttpConnection`] serves keep-alive requests over any `AsyncRead`/`AsyncWrite`
//! pair until the peer closes it or asks for a WebSocket upgrade, in which case the
//! socket halves come back as [`Upgraded`].

mod http_connection;

pub use http_connection::ConnectionOutcome;
pub use http_connection::HttpConnection;
pub use http_connection::Upgraded;
