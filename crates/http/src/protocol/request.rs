//! HTTP request head.
//!
//! [`RequestHeader`] wraps `http::Request<()>` and adds the lookups the server needs
//! before a body is attached: whether a body is expected, whether the client asks
//! for a WebSocket upgrade, and the raw values of the headers the parsers consume.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};

#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body, converting the head into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the value of `name` when it is present and visible ASCII.
    pub fn header_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.inner.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns false for methods that never carry a body.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// Returns true when the request carries any `Upgrade` header.
    pub fn is_upgrade(&self) -> bool {
        self.headers().contains_key(header::UPGRADE)
    }

    /// Returns true when `Upgrade` names the websocket protocol.
    pub fn is_websocket_upgrade(&self) -> bool {
        self.headers()
            .get_all(header::UPGRADE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("websocket"))
    }

    /// Returns the `Host` header without the port, if any.
    pub fn host(&self) -> Option<&str> {
        let host = self.header_str(header::HOST)?;
        // bracketed ipv6 literal keeps its colons
        if let Some(rest) = host.strip_prefix('[') {
            return rest.split_once(']').map(|(ip, _)| ip);
        }
        Some(host.split_once(':').map_or(host, |(name, _)| name))
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
