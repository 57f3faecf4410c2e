//! Streaming codecs for everything that crosses the wire.
//!
//! All codecs implement `tokio_util::codec::{Decoder, Encoder}` and are driven by
//! `FramedRead`/`FramedWrite` in the connection layer, or directly over a `BytesMut`.
//!
//! - HTTP/1.1: [`RequestDecoder`] turns bytes into a request head followed by body
//!   chunks, [`ResponseEncoder`] writes a response head and its `Content-Length` body.
//! - multipart/form-data: [`MultipartDecoder`] splits a request body into fields,
//!   using the incremental [`BoundaryScanner`] to find delimiters across arrivals.
//! - WebSocket: [`WsDecoder`] reassembles client frames into messages, [`WsEncoder`]
//!   writes unmasked server frames, and [`handshake`] validates the upgrade request.
//!
//! # Example
//!
//! ```
//! use strand_http::codec::{MultipartDecoder, MultipartItem};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = MultipartDecoder::new("xyz").unwrap();
//! let mut buf = BytesMut::from(&b"--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--xyz--\r\n"[..]);
//!
//! let Some(MultipartItem::Field(head)) = decoder.decode(&mut buf).unwrap() else { unreachable!() };
//! assert_eq!(head.name(), "a");
//! ```

mod body;
mod header;
mod multipart;
mod request_decoder;
mod response_encoder;
mod scanner;
pub mod websocket;

pub use multipart::FieldHead;
pub use multipart::MultipartDecoder;
pub use multipart::MultipartItem;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
pub use scanner::BoundaryScanner;
pub use scanner::ScanStep;
pub use websocket::handshake;
pub use websocket::{WsDecoder, WsEncoder};
