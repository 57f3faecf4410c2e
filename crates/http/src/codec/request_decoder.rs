//! Request decoder: a head, then the payload items of its body.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Decodes a stream of requests.
///
/// `payload_decoder` is `None` while a head is expected and `Some` while the body of
/// the last head is being read; it is cleared after the body's `Eof`.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((header, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((header, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use indoc::indoc;

    #[test]
    fn head_then_body_then_next_head() {
        let str = indoc! {r##"
        POST /form HTTP/1.1
        Content-Length: 7

        a=1&b=2GET /next HTTP/1.1

        "##};

        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();

        let Some(Message::Header((header, payload_size))) = decoder.decode(&mut buf).unwrap() else {
            panic!("expect head");
        };
        assert_eq!(header.uri().path(), "/form");
        assert_eq!(payload_size, PayloadSize::Length(7));

        let Some(Message::Payload(item)) = decoder.decode(&mut buf).unwrap() else {
            panic!("expect body chunk");
        };
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"a=1&b=2")));

        let Some(Message::Payload(item)) = decoder.decode(&mut buf).unwrap() else {
            panic!("expect body eof");
        };
        assert!(item.is_eof());

        let Some(Message::Header((header, payload_size))) = decoder.decode(&mut buf).unwrap() else {
            panic!("expect second head");
        };
        assert_eq!(header.uri().path(), "/next");
        assert!(payload_size.is_empty());
    }
}
