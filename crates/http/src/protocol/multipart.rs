//! Pull based access to a multipart/form-data request body.
//!
//! [`Multipart`] drives a [`MultipartDecoder`] over any `http_body::Body`. A field is
//! handed out as soon as its headers are parsed, before any of its payload was read,
//! and the body is polled only when the consumer asks for the next chunk.

use std::fmt::Display;
use std::future::poll_fn;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use http::HeaderMap;
use http_body::Body;
use tokio_util::codec::Decoder;

use crate::codec::{FieldHead, MultipartDecoder, MultipartItem};
use crate::protocol::MultipartError;

#[derive(Debug)]
pub struct Multipart<B> {
    body: B,
    decoder: MultipartDecoder,
    buf: BytesMut,
    body_eof: bool,
}

impl<B> Multipart<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    pub fn new(body: B, decoder: MultipartDecoder) -> Self {
        Self { body, decoder, buf: BytesMut::new(), body_eof: false }
    }

    /// Fails before touching the body when `content_type` has no usable boundary.
    pub fn from_content_type(body: B, content_type: &str) -> Result<Self, MultipartError> {
        Ok(Self::new(body, MultipartDecoder::from_content_type(content_type)?))
    }

    /// Returns the next field, skipping whatever is left of the previous one.
    pub async fn next_field(&mut self) -> Result<Option<MultipartField<'_, B>>, MultipartError> {
        loop {
            let item = poll_fn(|cx| self.poll_item(cx)).await?;
            match item {
                Some(MultipartItem::Field(head)) => return Ok(Some(MultipartField { multipart: self, head, done: false })),
                Some(MultipartItem::Data(_) | MultipartItem::FieldEnd) => continue,
                Some(MultipartItem::End) | None => return Ok(None),
            }
        }
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<MultipartItem>, MultipartError>> {
        loop {
            if self.body_eof {
                return Poll::Ready(self.decoder.decode_eof(&mut self.buf));
            }

            if let Some(item) = self.decoder.decode(&mut self.buf)? {
                return Poll::Ready(Ok(Some(item)));
            }

            match ready!(Pin::new(&mut self.body).poll_frame(cx)) {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        self.buf.extend_from_slice(&data);
                    }
                }
                Some(Err(e)) => return Poll::Ready(Err(MultipartError::body(e))),
                None => self.body_eof = true,
            }
        }
    }
}

/// One part of the body. Its payload is read with [`MultipartField::chunk`], or by
/// polling it as a `Stream`.
#[derive(Debug)]
pub struct MultipartField<'a, B> {
    multipart: &'a mut Multipart<B>,
    head: FieldHead,
    done: bool,
}

impl<B> MultipartField<'_, B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    pub fn name(&self) -> &str {
        self.head.name()
    }

    pub fn filename(&self) -> Option<&str> {
        self.head.filename()
    }

    pub fn is_file(&self) -> bool {
        self.head.is_file()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.head.content_type()
    }

    pub fn head(&self) -> &FieldHead {
        &self.head
    }

    /// Next payload chunk, `None` once the field is complete.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, MultipartError> {
        poll_fn(|cx| self.poll_chunk(cx)).await
    }

    /// Reads the rest of the payload into one buffer.
    pub async fn bytes(&mut self) -> Result<Bytes, MultipartError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<Bytes>, MultipartError>> {
        if self.done {
            return Poll::Ready(Ok(None));
        }

        let item = ready!(self.multipart.poll_item(cx))?;
        match item {
            Some(MultipartItem::Data(bytes)) => Poll::Ready(Ok(Some(bytes))),
            Some(MultipartItem::FieldEnd) => {
                self.done = true;
                Poll::Ready(Ok(None))
            }
            Some(MultipartItem::Field(_) | MultipartItem::End) | None => {
                self.done = true;
                Poll::Ready(Err(MultipartError::UnexpectedEnd))
            }
        }
    }
}

impl<B> Stream for MultipartField<'_, B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    type Item = Result<Bytes, MultipartError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_chunk(cx).map(Result::transpose)
    }
}
