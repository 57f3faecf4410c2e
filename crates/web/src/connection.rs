//! Per request view of a client connection.
//!
//! A [`Connection`] is built from the request head of every HTTP request and of every
//! WebSocket upgrade. Cookies, accepted languages, the query string and the session are
//! resolved on first access and cached for the rest of the request.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use http::{HeaderMap, Method, header};
use once_cell::sync::OnceCell;
use strand_http::params::{self, CookieJar, QueryMap};
use strand_http::protocol::RequestHeader;
use url::Url;

use crate::session::{Session, SessionStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Ws,
    Wss,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Ws => "ws",
            Protocol::Wss => "wss",
        }
    }

    pub fn is_secure(self) -> bool {
        matches!(self, Protocol::Https | Protocol::Wss)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Connection {
    header: RequestHeader,
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
    secure: bool,
    sessions: SessionStore,
    cookies: OnceCell<CookieJar>,
    langs: OnceCell<Vec<String>>,
    query: OnceCell<QueryMap>,
    session: OnceCell<Arc<Session>>,
}

impl Connection {
    pub fn new(header: RequestHeader, remote_addr: SocketAddr, local_addr: SocketAddr, secure: bool, sessions: SessionStore) -> Self {
        Self {
            header,
            remote_addr,
            local_addr,
            secure,
            sessions,
            cookies: OnceCell::new(),
            langs: OnceCell::new(),
            query: OnceCell::new(),
            session: OnceCell::new(),
        }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn method(&self) -> &Method {
        self.header.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.header.headers()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `ws`/`wss` when the request asks for any upgrade, `http`/`https` otherwise.
    pub fn protocol(&self) -> Protocol {
        match (self.header.is_upgrade(), self.secure) {
            (true, true) => Protocol::Wss,
            (true, false) => Protocol::Ws,
            (false, true) => Protocol::Https,
            (false, false) => Protocol::Http,
        }
    }

    /// The `Host` header without its port, the local ip when there is none.
    pub fn host(&self) -> String {
        match self.header.host() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => self.local_addr.ip().to_string(),
        }
    }

    pub fn path(&self) -> &str {
        self.header.uri().path()
    }

    /// The raw query string, empty when absent.
    pub fn query_string(&self) -> &str {
        self.header.uri().query().unwrap_or_default()
    }

    /// Decoded query string parameters.
    pub fn query(&self) -> &QueryMap {
        self.query.get_or_init(|| params::query::parse(self.query_string()))
    }

    /// The full request url as the client addressed it.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let port = self.header.header_str(header::HOST).and_then(|host| {
            let port = host.rsplit_once(':').map(|(_, port)| port)?;
            port.chars().all(|c| c.is_ascii_digit()).then_some(port)
        });

        let mut url = Url::parse(&format!("{}://{}", self.protocol(), self.url_host()))?;
        if let Some(port) = port.and_then(|port| port.parse::<u16>().ok()) {
            url.set_port(Some(port)).map_err(|()| url::ParseError::InvalidPort)?;
        }
        url.set_path(self.path());
        url.set_query(self.header.uri().query());
        Ok(url)
    }

    fn url_host(&self) -> String {
        let host = self.host();
        if host.contains(':') { format!("[{host}]") } else { host }
    }

    pub fn cookies(&self) -> &CookieJar {
        self.cookies.get_or_init(|| {
            let mut jar = CookieJar::default();
            for value in self.header.headers().get_all(header::COOKIE) {
                if let Ok(value) = value.to_str() {
                    jar.extend(params::cookie::parse(value));
                }
            }
            jar
        })
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name)
    }

    /// Accepted languages, most preferred first.
    pub fn langs(&self) -> &[String] {
        self.langs.get_or_init(|| self.header.header_str(header::ACCEPT_LANGUAGE).map(params::lang::parse).unwrap_or_default())
    }

    pub fn lang(&self) -> Option<&str> {
        self.langs().first().map(String::as_str)
    }

    /// The session of this client. It is looked up from the session cookie on first
    /// access, a fresh one is created when the cookie is missing or expired.
    pub fn session(&self) -> &Arc<Session> {
        self.session.get_or_init(|| self.sessions.resolve(self.cookies().session_id()).0)
    }

    /// Renews the live session named by the session cookie. Without one nothing happens,
    /// the session is then created on first use.
    pub fn renew_session(&self) -> Option<&Arc<Session>> {
        let id = self.cookies().session_id()?;
        if !self.sessions.touch(id) {
            return None;
        }
        let session = self.sessions.get(id)?;
        Some(self.session.get_or_init(|| session))
    }

    /// Whether the session was used or renewed during this request.
    pub fn session_used(&self) -> bool {
        self.session.get().is_some()
    }

    /// `Set-Cookie` value for the session, `None` when it was neither renewed nor used.
    pub fn session_cookie(&self, domain: Option<&str>) -> Option<String> {
        let session = self.session.get()?;
        let host;
        let domain = match domain {
            Some(domain) => domain,
            None => {
                host = self.host();
                &host
            }
        };
        Some(self.sessions.set_cookie_value(session.id(), domain))
    }
}
