use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use http_body_util::Full;
use strand_http::connection::{ConnectionOutcome, HttpConnection};
use strand_http::handler::make_handler;
use strand_http::protocol::body::ReqBody;
use strand_http::protocol::{Multipart, MultipartError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const BOUNDARY: &str = "----strandBoundary0123";

fn upload_body(file: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"title\"\r\n\r\nholiday\r\n");
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"photo\"; filename=\"sea.bin\"\r\n");
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn summarize(req: Request<ReqBody>) -> Result<Response<Full<Bytes>>, MultipartError> {
    let content_type = req.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).unwrap_or_default().to_string();
    let mut multipart = Multipart::from_content_type(req.into_body(), &content_type)?;

    let mut summary = String::new();
    while let Some(mut field) = multipart.next_field().await? {
        let bytes = field.bytes().await?;
        let checksum = bytes.iter().fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(*byte)));
        summary.push_str(&format!("{}:{}:{}:{checksum}\n", field.name(), field.filename().unwrap_or("-"), bytes.len()));
    }
    Ok(Response::new(Full::new(Bytes::from(summary))))
}

#[tokio::test]
async fn stream_upload_through_small_pipe() {
    // a tiny pipe makes every boundary arrive split across reads
    let (mut client, server) = tokio::io::duplex(13);
    let (reader, writer) = tokio::io::split(server);

    let handler = Arc::new(make_handler(summarize));
    let server = tokio::spawn(HttpConnection::new(reader, writer).process(handler));

    let file = b"\r\n--not the boundary\r\n--".iter().copied().cycle().take(20_000).collect::<Vec<_>>();
    let body = upload_body(&file);
    let head = format!(
        "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Type: multipart/form-data; boundary={BOUNDARY}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );

    client.write_all(head.as_bytes()).await.unwrap();
    client.write_all(&body).await.unwrap();
    client.shutdown().await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8(response).unwrap();

    let checksum = file.iter().fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(*byte)));
    let title_checksum = b"holiday".iter().fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(*byte)));
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with(&format!("title:-:7:{title_checksum}\nphoto:sea.bin:20000:{checksum}\n")), "{response}");

    assert!(matches!(server.await.unwrap(), Ok(ConnectionOutcome::Closed)));
}

#[tokio::test]
async fn malformed_upload_is_server_error() {
    let (mut client, server) = tokio::io::duplex(1024);
    let (reader, writer) = tokio::io::split(server);

    let handler = Arc::new(make_handler(summarize));
    let server = tokio::spawn(HttpConnection::new(reader, writer).process(handler));

    let body = format!("--{BOUNDARY}\r\nContent-Type: text/plain\r\n\r\nno disposition\r\n--{BOUNDARY}--\r\n");
    let request = format!(
        "POST /upload HTTP/1.1\r\nContent-Type: multipart/form-data; boundary={BOUNDARY}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    client.write_all(request.as_bytes()).await.unwrap();
    client.shutdown().await.unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    assert!(matches!(server.await.unwrap(), Ok(ConnectionOutcome::Closed)));
}
