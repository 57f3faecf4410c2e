//! Turns an upgrade request handed back by the HTTP loop into a WebSocket connection.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use strand_http::codec::handshake;
use strand_http::connection::Upgraded;
use strand_http::protocol::WsError;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::connection::WsConnection;
use super::{WsFailure, WsHandler, WsSession};
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::session::SessionStore;

/// Frames a [`WsSession`] may queue before sending waits.
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Peer {
    pub(crate) remote_addr: SocketAddr,
    pub(crate) local_addr: SocketAddr,
}

/// Answers the upgrade request and serves the connection.
///
/// No handler for the path is a 404, an invalid handshake a 400; both close the
/// socket. Otherwise the `101` carries the session cookie and the connection runs
/// until either side closes it.
pub(crate) async fn serve_upgrade<R, W>(
    upgraded: Upgraded<R, W>,
    handler: Option<Arc<dyn WsHandler>>,
    config: &ServerConfig,
    sessions: &SessionStore,
    peer: Peer,
) -> Result<(), WsFailure>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Upgraded { header, reader, mut writer, read_buf } = upgraded;

    let Some(handler) = handler else {
        warn!(path = header.uri().path(), "no websocket host for path");
        refuse(&mut writer, StatusCode::NOT_FOUND).await?;
        return Ok(());
    };

    let handshake = match handshake::validate(&header, &config.origins, handler.protocols()) {
        Ok(handshake) => handshake,
        Err(e) => {
            warn!(cause = %e, path = header.uri().path(), "websocket handshake refused");
            refuse(&mut writer, StatusCode::BAD_REQUEST).await?;
            return Ok(());
        }
    };

    let connection = Connection::new(header, peer.remote_addr, peer.local_addr, config.secure, sessions.clone());
    connection.session();

    let mut extra = HeaderMap::new();
    if let Some(cookie) = connection.session_cookie(config.domain.as_deref()) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                extra.insert(SET_COOKIE, value);
            }
            Err(e) => warn!(cause = %e, "session cookie is not a valid header value"),
        }
    }

    let mut buf = BytesMut::with_capacity(256);
    handshake::encode_response(&handshake.response(extra), &mut buf);
    writer.write_all(&buf).await.map_err(WsError::from)?;
    writer.flush().await.map_err(WsError::from)?;

    info!(path = connection.path(), protocol = handshake.protocol(), remote = %peer.remote_addr, "websocket connection opened");

    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let session = WsSession::new(Arc::new(connection), handshake.protocol().map(str::to_string), tx);
    WsConnection::new(reader, writer, read_buf, handler, session, rx, config).run().await
}

async fn refuse<W>(writer: &mut W, status: StatusCode) -> Result<(), WsError>
where
    W: AsyncWrite + Unpin,
{
    let reason = status.canonical_reason().unwrap_or_default();

    let mut head = Response::new(());
    *head.status_mut() = status;
    let headers = head.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(reason.len()));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    let mut buf = BytesMut::with_capacity(128);
    handshake::encode_response(&head, &mut buf);
    buf.extend_from_slice(reason.as_bytes());

    writer.write_all(&buf).await?;
    writer.shutdown().await?;
    Ok(())
}
