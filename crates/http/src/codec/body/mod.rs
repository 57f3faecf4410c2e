//! Payload framing for request and response bodies.
//!
//! Only `Content-Length` framing exists: [`PayloadDecoder`] and [`PayloadEncoder`] either
//! count bytes down to zero or stand for an absent body.

mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
