use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Writes payload chunks until the announced length is reached.
///
/// Bytes beyond the announced length are dropped with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                let remaining = bytes.remaining() as u64;
                if remaining > self.length {
                    warn!(extra = remaining - self.length, "response body longer than its content-length");
                }
                let mut take = remaining.min(self.length) as usize;
                dst.reserve(take);
                self.length -= take as u64;
                while take > 0 {
                    let chunk = bytes.chunk();
                    let n = chunk.len().min(take);
                    dst.extend_from_slice(&chunk[..n]);
                    bytes.advance(n);
                    take -= n;
                }
                Ok(())
            }
            PayloadItem::Eof => {
                if self.length > 0 {
                    warn!(missing = self.length, "response body shorter than its content-length");
                }
                self.eof = true;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn truncate_to_announced_length() {
        let mut encoder = LengthEncoder::new(4);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"ab")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"cdef")), &mut dst).unwrap();
        assert!(!encoder.is_finish());
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"abcd");
        assert!(encoder.is_finish());
    }
}
