//! RFC 6455 framing and the opening handshake.

mod frame_decoder;
mod frame_encoder;
pub mod handshake;

pub use frame_decoder::{DecodeStep, UNMASK_SLICE, WsDecoder};
pub use frame_encoder::WsEncoder;
