//! Request head decoding and response head encoding.
//!
//! - [`HeaderDecoder`]: request line and header fields, body size from `Content-Length`
//! - [`HeaderEncoder`]: status line and header fields, `Content-Length` always set

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
