//! multipart/form-data body decoding.

mod decoder;
mod disposition;

pub use decoder::FieldHead;
pub use decoder::MultipartDecoder;
pub use decoder::MultipartItem;
