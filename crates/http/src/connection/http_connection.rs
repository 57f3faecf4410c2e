use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use futures::{SinkExt, StreamExt};
use http::header::EXPECT;
use http::{Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::body::ReqBody;
use crate::protocol::{
    HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError, status_response,
};

/// How a connection's request loop ended.
#[derive(Debug)]
pub enum ConnectionOutcome<R, W> {
    /// The peer closed the connection.
    Closed,
    /// The client asked for a WebSocket upgrade, the socket now belongs to the caller.
    Upgrade(Upgraded<R, W>),
}

/// The socket halves of a connection that left the HTTP loop for an upgrade.
#[derive(Debug)]
pub struct Upgraded<R, W> {
    pub header: RequestHeader,
    pub reader: R,
    pub writer: W,
    /// Bytes that arrived after the request head, already read from `reader`.
    pub read_buf: BytesMut,
}

/// A keep-alive HTTP/1.1 connection.
///
/// Requests are served one at a time: the head is decoded, the handler runs while its
/// body is streamed to it on demand, whatever it didn't read is drained, and the
/// response is written with a `Content-Length`. A WebSocket upgrade request ends the
/// loop and hands the socket back through [`ConnectionOutcome::Upgrade`].
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<ConnectionOutcome<R, W>, HttpError>
    where
        H: Handler,
        H::RespBody: Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, _)))) if header.is_websocket_upgrade() => {
                    debug!(path = header.uri().path(), "websocket upgrade requested");
                    return Ok(ConnectionOutcome::Upgrade(self.into_upgraded(header)));
                }

                Some(Ok(Message::Header((header, payload_size)))) => {
                    self.do_process(header, payload_size, &handler).await?;
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("received payload while expecting a request head");
                    self.do_send_response(status_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    self.do_send_response(status_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(ConnectionOutcome::Closed);
                }
            }
        }
    }

    fn into_upgraded(mut self, header: RequestHeader) -> Upgraded<R, W> {
        let read_buf = self.framed_read.read_buffer_mut().split();
        Upgraded { header, reader: self.framed_read.into_inner(), writer: self.framed_write.into_inner(), read_buf }
    }

    async fn do_process<H>(&mut self, header: RequestHeader, payload_size: PayloadSize, handler: &Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        if let Some(value) = header.headers().get(EXPECT) {
            let slice = value.as_bytes();
            if slice.len() >= 4 && &slice[0..4] == b"100-" {
                let writer = self.framed_write.get_mut();
                writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
                writer.flush().await.map_err(SendError::io)?;
                info!("receive expect request header, sent continue response");
            }
        }

        let (req_body, mut body_sender) = ReqBody::body_channel(&mut self.framed_read, payload_size);
        let request = header.body(req_body);

        // the handler may stop reading the body at any point, so it runs alongside the
        // sender instead of after it
        let response_result = {
            tokio::pin! {
                let request_handle_future = handler.call(request);
                let body_sender_future = body_sender.send_body();
            }

            let mut sender_done = false;
            loop {
                select! {
                    biased;
                    response = &mut request_handle_future => break response,
                    result = &mut body_sender_future, if !sender_done => {
                        sender_done = true;
                        if let Err(e) = result {
                            debug!(cause = %e, "request body streaming stopped");
                        }
                    }
                }
            }
        };

        body_sender.skip_body().await?;

        self.send_response(response_result).await
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => self.do_send_response(response).await,
            Err(e) => {
                let e = e.into();
                error!(cause = %e, "handle response error");
                self.do_send_response(status_response(StatusCode::INTERNAL_SERVER_ERROR)).await
            }
        }
    }

    /// Streams bodies with an exact size, buffers the others to learn their length.
    async fn do_send_response<T>(&mut self, response: Response<T>) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (header_parts, body) = response.into_parts();
        let head = ResponseHead::from_parts(header_parts, ());

        match body.size_hint().exact() {
            Some(length) => self.send_with_length(head, body, length).await,
            None => {
                let bytes = body
                    .collect()
                    .await
                    .map_err(|e| SendError::invalid_body(format!("resolve response body error: {e}")))?
                    .to_bytes();
                let length = bytes.len() as u64;
                self.send_with_length(head, Full::new(bytes), length).await
            }
        }
    }

    async fn send_with_length<T>(&mut self, head: ResponseHead, mut body: T, length: u64) -> Result<(), HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let payload_size = if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) };

        let header = Message::<_, T::Data>::Header((head, payload_size));
        if !payload_size.is_empty() {
            self.framed_write.feed(header).await?;
        } else {
            // nothing follows the head, flush it now
            self.framed_write.send(header).await?;
        }

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        debug!("response trailers are not supported, skipped");
                        continue;
                    };
                    if !data.has_remaining() {
                        continue;
                    }

                    self.framed_write
                        .send(Message::Payload(PayloadItem::Chunk(data)))
                        .await
                        .map_err(|_e| SendError::invalid_body("can't send response"))?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed_write
                        .feed(Message::Payload(PayloadItem::<T::Data>::Eof))
                        .await
                        .map_err(|e| SendError::invalid_body(format!("can't send eof response: {e}")))?;
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use bytes::Bytes;
    use http::Request;
    use http_body_util::StreamBody;
    use indoc::indoc;
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream, ReadHalf, WriteHalf, duplex};

    async fn echo(req: Request<ReqBody>) -> Result<Response<Full<Bytes>>, Infallible> {
        let path = req.uri().path().to_string();
        let body = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();
        Ok(Response::new(Full::new(Bytes::from(format!("{path}:{}", String::from_utf8_lossy(&body))))))
    }

    type Outcome = ConnectionOutcome<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    async fn serve(input: &'static str) -> (String, Result<Outcome, HttpError>) {
        let (client, server) = duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        client_write.write_all(input.as_bytes()).await.unwrap();
        client_write.shutdown().await.unwrap();

        let outcome = HttpConnection::new(reader, writer).process(Arc::new(make_handler(echo))).await;

        let mut output = Vec::new();
        // an upgraded outcome keeps the server half open
        let _ = tokio::time::timeout(Duration::from_millis(100), client_read.read_to_end(&mut output)).await;
        (String::from_utf8(output).unwrap(), outcome)
    }

    #[tokio::test]
    async fn keep_alive_requests() {
        let input = indoc! {"
        POST /first HTTP/1.1\r
        Content-Length: 5\r
        \r
        helloGET /second HTTP/1.1\r
        \r
        "};

        let (output, outcome) = serve(input).await;
        assert!(matches!(outcome, Ok(ConnectionOutcome::Closed)));
        assert_eq!(
            output,
            "HTTP/1.1 200 OK\r\ncontent-length: 12\r\n\r\n/first:hello\
             HTTP/1.1 200 OK\r\ncontent-length: 8\r\n\r\n/second:"
        );
    }

    #[tokio::test]
    async fn expect_continue() {
        let input = indoc! {"
        POST /upload HTTP/1.1\r
        Expect: 100-continue\r
        Content-Length: 2\r
        \r
        ok"};

        let (output, _) = serve(input).await;
        assert!(output.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with("/upload:ok"));
    }

    #[tokio::test]
    async fn bad_request_on_parse_error() {
        let input = indoc! {"
        POST /upload HTTP/1.1\r
        Transfer-Encoding: chunked\r
        \r
        "};

        let (output, outcome) = serve(input).await;
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(matches!(outcome, Err(HttpError::RequestError { .. })));
    }

    #[tokio::test]
    async fn upgrade_hands_back_the_socket() {
        let input = indoc! {"
        GET /chat HTTP/1.1\r
        Upgrade: websocket\r
        Connection: Upgrade\r
        \r
        early"};

        let (output, outcome) = serve(input).await;
        assert!(output.is_empty());
        let Ok(ConnectionOutcome::Upgrade(upgraded)) = outcome else {
            panic!("expect upgrade");
        };
        assert_eq!(upgraded.header.uri().path(), "/chat");
        assert_eq!(&upgraded.read_buf[..], b"early");
    }

    #[tokio::test]
    async fn unsized_body_is_buffered() {
        let handler = make_handler(|_req: Request<ReqBody>| async {
            let chunks = vec![
                Ok::<_, Infallible>(http_body::Frame::data(Bytes::from_static(b"ab"))),
                Ok(http_body::Frame::data(Bytes::from_static(b"cd"))),
            ];
            Ok::<_, Infallible>(Response::new(StreamBody::new(futures::stream::iter(chunks))))
        });

        let (client, server) = duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        client_write.shutdown().await.unwrap();

        let outcome = HttpConnection::new(reader, writer).process(Arc::new(handler)).await;
        assert!(matches!(outcome, Ok(ConnectionOutcome::Closed)));

        let mut output = Vec::new();
        client_read.read_to_end(&mut output).await.unwrap();
        assert_eq!(&output[..], b"HTTP/1.1 200 OK\r\ncontent-length: 4\r\n\r\nabcd");
    }
}
