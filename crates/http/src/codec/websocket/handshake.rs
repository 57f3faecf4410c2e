//! WebSocket opening handshake, RFC 6455 section 4.2.

use base64::prelude::*;
use bytes::{BufMut, BytesMut};
use http::{HeaderMap, HeaderValue, Response, StatusCode, header};
use sha1::{Digest, Sha1};

use crate::ensure;
use crate::protocol::{HandshakeError, RequestHeader, ResponseHead};

pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `Sec-WebSocket-Accept` for a client key: base64(SHA-1(key + GUID)).
pub fn accept_key(key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key);
    hasher.update(WS_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// An upgrade request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    accept: String,
    protocol: Option<String>,
}

impl Handshake {
    pub fn accept(&self) -> &str {
        &self.accept
    }

    /// The subprotocol picked from the client's offer, if any.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Builds the `101 Switching Protocols` head. `extra` is appended as is, the
    /// session cookie travels this way.
    pub fn response(&self, extra: HeaderMap) -> ResponseHead {
        let mut response = Response::new(());
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;

        let headers = response.headers_mut();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
        if let Ok(accept) = HeaderValue::from_str(&self.accept) {
            headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept);
        }
        if let Some(protocol) = self.protocol.as_deref().and_then(|p| HeaderValue::from_str(p).ok()) {
            headers.insert(header::SEC_WEBSOCKET_PROTOCOL, protocol);
        }
        headers.extend(extra);
        response
    }
}

/// Validates an upgrade request.
///
/// `origins` lists accepted origins, either full (`https://example.com`) or by host;
/// an empty list or `*` accepts any origin. Requests without `Origin` come from
/// non-browser clients and are accepted. `protocols` are the subprotocols the
/// application speaks, the first one the client offers wins.
pub fn validate(header: &RequestHeader, origins: &[String], protocols: &[&str]) -> Result<Handshake, HandshakeError> {
    ensure!(header.is_websocket_upgrade(), HandshakeError::NotWebSocket);

    let key = header.header_str(header::SEC_WEBSOCKET_KEY).map(str::trim).filter(|key| !key.is_empty());
    let key = key.ok_or(HandshakeError::MissingKey)?;

    ensure!(
        header.header_str(header::SEC_WEBSOCKET_VERSION).map(str::trim) == Some("13"),
        HandshakeError::UnsupportedVersion
    );

    if let Some(origin) = header.header_str(header::ORIGIN) {
        ensure!(origin_allowed(origin, origins), HandshakeError::OriginNotAllowed { origin: origin.to_string() });
    }

    Ok(Handshake { accept: accept_key(key.as_bytes()), protocol: select_protocol(header, protocols) })
}

pub fn origin_allowed(origin: &str, origins: &[String]) -> bool {
    if origins.is_empty() {
        return true;
    }

    let host = origin_host(origin);
    origins.iter().any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin) || allowed.eq_ignore_ascii_case(host))
}

/// `https://example.com:8443` -> `example.com`
fn origin_host(origin: &str) -> &str {
    let rest = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    let rest = rest.split('/').next().unwrap_or(rest);
    if let Some(bracketed) = rest.strip_prefix('[') {
        return bracketed.split_once(']').map_or(rest, |(ip, _)| ip);
    }
    rest.split_once(':').map_or(rest, |(host, _)| host)
}

fn select_protocol(header: &RequestHeader, protocols: &[&str]) -> Option<String> {
    header
        .headers()
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find(|offered| protocols.iter().any(|supported| supported.eq_ignore_ascii_case(offered)))
        .map(str::to_string)
}

/// Writes a `101` head. Unlike regular responses it carries no `Content-Length`.
pub fn encode_response(response: &ResponseHead, dst: &mut BytesMut) {
    let status = response.status();
    dst.reserve(256);
    dst.put_slice(b"HTTP/1.1 ");
    dst.put_slice(status.as_str().as_bytes());
    dst.put_slice(b" ");
    dst.put_slice(status.canonical_reason().unwrap_or("Unknown").as_bytes());
    dst.put_slice(b"\r\n");

    for (name, value) in response.headers() {
        dst.put_slice(name.as_ref());
        dst.put_slice(b": ");
        dst.put_slice(value.as_ref());
        dst.put_slice(b"\r\n");
    }
    dst.put_slice(b"\r\n");
}
