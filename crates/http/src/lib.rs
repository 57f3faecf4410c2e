//! Streaming protocol plumbing for the strand application server
//!
//! This crate contains everything that touches raw bytes: the HTTP/1.1 request loop,
//! the multipart/form-data body parser, the WebSocket frame codec and handshake, and the
//! small parsers for query strings, cookies and `Accept-Language` headers.
//!
//! Every parser is an owned state machine fed one arrival of bytes at a time. Tokens
//! that straddle two arrivals (a boundary marker split across TCP segments, a frame
//! header cut after its first byte) resume from saved cursors, so the output never
//! depends on how the input was chunked.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Response, StatusCode};
//! use std::sync::Arc;
//! use strand_http::connection::{ConnectionOutcome, HttpConnection};
//! use strand_http::handler::make_handler;
//! use strand_http::protocol::body::ReqBody;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(|_req: http::Request<ReqBody>| async {
//!         Response::builder()
//!             .status(StatusCode::OK)
//!             .body(http_body_util::Full::new(Bytes::from_static(b"Hello World!\r\n")))
//!     }));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             match HttpConnection::new(reader, writer).process(handler).await {
//!                 Ok(ConnectionOutcome::Closed) => info!("finished process, connection shutdown"),
//!                 Ok(ConnectionOutcome::Upgrade(_)) => info!("websocket upgrade requested"),
//!                 Err(e) => error!(cause = %e, "connection shutdown"),
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: byte level decoders and encoders (`tokio_util::codec` based)
//! - [`protocol`]: message types, errors, request body channel and the multipart consumer
//! - [`params`]: query string, cookie, `Accept-Language` and `Content-Type` parsers
//! - [`connection`]: the keep-alive HTTP request loop
//! - [`handler`]: the request handler trait
//!
//! # Limitations
//!
//! - HTTP/1.1 only, requests on one connection are served one at a time
//! - No chunked transfer-encoding
//! - WebSocket extensions (compression) are rejected
//! - Maximum request header size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod params;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
