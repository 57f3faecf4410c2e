use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{Response, StatusCode};
use http_body_util::Empty;
use strand_http::codec::handshake;
use strand_http::codec::{WsDecoder, WsEncoder};
use strand_http::connection::{ConnectionOutcome, HttpConnection};
use strand_http::handler::make_handler;
use strand_http::protocol::body::ReqBody;
use strand_http::protocol::{WsError, WsEvent, WsFrame, WsMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite};

const MASK: [u8; 4] = [0x12, 0x34, 0x56, 0x78];

fn client_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![(if fin { 0x80 } else { 0x00 }) | opcode];
    match payload.len() {
        len if len < 126 => frame.push(0x80 | len as u8),
        len => {
            frame.push(0x80 | 126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
    frame.extend_from_slice(&MASK);
    frame.extend(payload.iter().enumerate().map(|(i, byte)| byte ^ MASK[i % 4]));
    frame
}

#[tokio::test]
async fn upgrade_then_exchange_frames() {
    let (mut client, server) = tokio::io::duplex(1024);
    let (reader, writer) = tokio::io::split(server);

    let handler = Arc::new(make_handler(|_req: http::Request<ReqBody>| async {
        Ok::<_, std::convert::Infallible>(Response::builder().status(StatusCode::OK).body(Empty::<Bytes>::new()).unwrap())
    }));
    let server = tokio::spawn(async move {
        let Ok(ConnectionOutcome::Upgrade(upgraded)) = HttpConnection::new(reader, writer).process(handler).await else {
            panic!("expected an upgrade");
        };

        let accepted = handshake::validate(&upgraded.header, &[], &["chat"]).unwrap();
        let mut head = BytesMut::new();
        handshake::encode_response(&accepted.response(http::HeaderMap::new()), &mut head);

        let mut writer = upgraded.writer;
        writer.write_all(&head).await.unwrap();

        // bytes read past the request head are decoded before the socket is polled
        let mut decoder = WsDecoder::new(1024);
        let mut read_buf = upgraded.read_buf;
        let mut buffered = Vec::new();
        while let Some(event) = decoder.decode(&mut read_buf).unwrap() {
            buffered.push(Ok(event));
        }
        let mut socket = FramedRead::new(upgraded.reader, decoder);
        socket.read_buffer_mut().unsplit(read_buf);
        let mut frames = futures::stream::iter(buffered).chain(socket);

        let mut writer = FramedWrite::new(writer, WsEncoder);
        let mut received = Vec::new();
        while let Some(event) = frames.next().await {
            match event.unwrap() {
                WsEvent::Message(message) => {
                    writer.send(WsFrame::from(message.clone())).await.unwrap();
                    received.push(message);
                }
                WsEvent::Ping(payload) => writer.send(WsFrame::Pong(payload)).await.unwrap(),
                WsEvent::Close => {
                    writer.send(WsFrame::Close).await.unwrap();
                    break;
                }
            }
        }
        received
    });

    let mut request = b"GET /chat HTTP/1.1\r\n\
        Host: server.example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Protocol: superchat, chat\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n"
        .to_vec();
    // first frame travels with the request head
    request.extend(client_frame(false, 0x1, b"Hel"));
    client.write_all(&request).await.unwrap();
    client.write_all(&client_frame(true, 0x9, b"ping")).await.unwrap();
    client.write_all(&client_frame(true, 0x0, b"lo")).await.unwrap();
    client.write_all(&client_frame(true, 0x2, &[0u8; 300])).await.unwrap();
    client.write_all(&client_frame(true, 0x8, b"")).await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();

    let head_end = response.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let head = std::str::from_utf8(&response[..head_end]).unwrap();
    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
    assert!(head.contains("sec-websocket-accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
    assert!(head.contains("sec-websocket-protocol: chat\r\n"));

    let mut expected = vec![0x8A, 4];
    expected.extend_from_slice(b"ping");
    expected.extend_from_slice(&[0x81, 5]);
    expected.extend_from_slice(b"Hello");
    expected.extend_from_slice(&[0x82, 126, 0x01, 0x2C]);
    expected.extend_from_slice(&[0u8; 300]);
    expected.extend_from_slice(&[0x88, 0x00]);
    assert_eq!(&response[head_end..], &expected[..]);

    let received = server.await.unwrap();
    assert_eq!(received, vec![WsMessage::Text("Hello".to_string()), WsMessage::Binary(Bytes::from(vec![0u8; 300]))]);
}

#[tokio::test]
async fn oversized_message_fails_before_delivery() {
    let (mut client, server) = tokio::io::duplex(64);

    let writer = tokio::spawn(async move {
        let mut frames = client_frame(false, 0x1, &[b'a'; 100]);
        frames.extend(client_frame(true, 0x0, &[b'b'; 100]));
        // the reader stops early, so the tail may never be taken
        let _ = client.write_all(&frames).await;
    });

    let mut frames = FramedRead::new(server, WsDecoder::new(150));
    assert!(matches!(frames.next().await, Some(Err(WsError::MessageTooBig { limit: 150 }))));

    drop(frames);
    writer.await.unwrap();
}
