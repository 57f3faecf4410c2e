use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Hands out at most `length` bytes as payload chunks, then `Eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    pub fn remaining(&self) -> u64 {
        self.length
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.length, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();

        self.length -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_at_announced_length() {
        let mut buffer: BytesMut = BytesMut::from(&b"1012345678GET / HTTP/1.1\r\n"[..]);

        let mut length_decoder = LengthDecoder::new(10);
        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(payload.as_bytes().map(|b| &b[..]), Some(&b"1012345678"[..]));
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");
        assert_eq!(length_decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn split_arrivals() {
        let mut length_decoder = LengthDecoder::new(6);

        let mut buffer = BytesMut::from(&b"abc"[..]);
        assert_eq!(length_decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Chunk("abc".into())));
        assert_eq!(length_decoder.decode(&mut buffer).unwrap(), None);
        assert_eq!(length_decoder.remaining(), 3);

        buffer.extend_from_slice(b"defg");
        assert_eq!(length_decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Chunk("def".into())));
        assert_eq!(&buffer[..], b"g");
    }
}
