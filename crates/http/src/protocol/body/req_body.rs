use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame, SizeHint};
use tracing::{debug, error, trace};

use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

type RequestStreamItem = Result<Message<(RequestHeader, PayloadSize)>, ParseError>;

/// Request body handed to handlers.
///
/// Every poll asks the [`ReqBodySender`] for exactly one more payload item, so the socket
/// is only read when the handler wants data. Multipart uploads are parsed on top of this
/// body, which is what bounds their memory use.
#[derive(Debug)]
pub struct ReqBody {
    signal: mpsc::Sender<oneshot::Sender<PayloadItem>>,
    receiving: Option<oneshot::Receiver<PayloadItem>>,
    payload_size: PayloadSize,
    eof: bool,
}

impl ReqBody {
    /// Creates the consumer/producer pair for one request.
    ///
    /// The producer borrows the connection's decoded stream; it must be driven
    /// (see [`ReqBodySender::send_body`]) while the handler runs.
    pub fn body_channel<S>(payload_stream: &mut S, payload_size: PayloadSize) -> (ReqBody, ReqBodySender<'_, S>)
    where
        S: Stream<Item = RequestStreamItem> + Unpin,
    {
        let (signal, receiver) = mpsc::channel(1);
        let eof = payload_size.is_empty();

        let req_body = ReqBody { signal, receiving: None, payload_size, eof };
        let body_sender = ReqBodySender { payload_stream, receiver, eof: false };

        (req_body, body_sender)
    }
}

/// Reads payload items from the connection on behalf of a [`ReqBody`].
pub struct ReqBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<PayloadItem>>,
    eof: bool,
}

impl<S> ReqBodySender<'_, S>
where
    S: Stream<Item = RequestStreamItem> + Unpin,
{
    /// Answers chunk requests until the payload is exhausted or the body is dropped.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        while !self.eof {
            let Some(sender) = self.receiver.next().await else {
                // body dropped by the handler
                return Ok(());
            };

            let payload_item = self.read_item().await?;
            if payload_item.is_eof() {
                self.eof = true;
            }

            if sender.send(payload_item).is_err() {
                trace!("request body receiver gone before chunk delivery");
            }
        }
        Ok(())
    }

    /// Drains what the handler left unread so the next request starts at a clean offset.
    pub async fn skip_body(&mut self) -> Result<(), ParseError> {
        let mut size: usize = 0;
        while !self.eof {
            match self.read_item().await? {
                PayloadItem::Eof => self.eof = true,
                PayloadItem::Chunk(bytes) => size += bytes.len(),
            }
        }
        if size > 0 {
            debug!(size = size, "skip request body");
        }
        Ok(())
    }

    async fn read_item(&mut self) -> Result<PayloadItem, ParseError> {
        match self.payload_stream.next().await {
            Some(Ok(Message::Payload(payload_item))) => Ok(payload_item),
            Some(Ok(Message::Header(_header))) => {
                error!("received header from receive body phase");
                Err(ParseError::invalid_body("received header from receive body phase"))
            }
            Some(Err(e)) => Err(e),
            None => Err(ParseError::invalid_body("connection closed before the body was complete")),
        }
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if self.eof {
            return Poll::Ready(None);
        }

        loop {
            if let Some(oneshot_receiver) = &mut self.receiving {
                let received = ready!(oneshot_receiver.poll_unpin(cx));
                self.receiving.take();
                return match received {
                    Ok(PayloadItem::Chunk(bytes)) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                    Ok(PayloadItem::Eof) => {
                        self.eof = true;
                        Poll::Ready(None)
                    }
                    Err(_) => {
                        self.eof = true;
                        Poll::Ready(Some(Err(ParseError::invalid_body("parse body canceled"))))
                    }
                };
            }

            if let Err(e) = ready!(self.signal.poll_ready_unpin(cx)) {
                return Poll::Ready(Some(Err(ParseError::invalid_body(e))));
            }

            let (tx, rx) = oneshot::channel();
            if let Err(e) = self.signal.start_send(tx) {
                return Poll::Ready(Some(Err(ParseError::invalid_body(e))));
            }
            self.receiving = Some(rx);
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }

    fn size_hint(&self) -> SizeHint {
        self.payload_size.into()
    }
}
