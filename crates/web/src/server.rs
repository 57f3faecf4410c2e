//! The application server: accept loop, HTTP dispatch and WebSocket upgrades.

use std::collections::HashMap;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderValue, Request as HttpRequest, Response, StatusCode};
use strand_http::connection::{ConnectionOutcome, HttpConnection};
use strand_http::handler::Handler;
use strand_http::protocol::RequestHeader;
use strand_http::protocol::body::ReqBody;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{ConfigError, ServerConfig};
use crate::connection::Connection;
use crate::form::read_form;
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::responder::status_response;
use crate::router::Router;
use crate::session::SessionStore;
use crate::ws::{self, Peer, WsHandler};
use crate::ResponseBody;

pub struct ServerBuilder {
    router: Option<Router>,
    default_handler: Option<Box<dyn RequestHandler>>,
    ws_hosts: HashMap<String, Arc<dyn WsHandler>>,
    config: ServerConfig,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("router", &self.router)
            .field("ws_hosts", &self.ws_hosts.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, default_handler: None, ws_hosts: HashMap::new(), config: ServerConfig::default() }
    }

    /// Overrides the configured listen address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Answers requests no route matched, a plain 404 otherwise.
    pub fn default_handler(mut self, request_handler: impl RequestHandler + 'static) -> Self {
        self.default_handler = Some(Box::new(request_handler));
        self
    }

    /// Accepts WebSocket upgrades on `path`.
    pub fn ws_host(mut self, path: impl Into<String>, handler: impl WsHandler) -> Self {
        self.ws_hosts.insert(path.into(), Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        if self.router.is_none() && self.ws_hosts.is_empty() {
            return Err(ServerBuildError::MissingRouter);
        }
        self.config.validate()?;

        let router = match self.router {
            Some(router) => router,
            None => Router::builder().build().map_err(|e| ServerBuildError::Router { reason: e.to_string() })?,
        };
        let sessions = SessionStore::new(self.config.session_ttl());
        let state = ServerState { router, default_handler: self.default_handler, ws_hosts: self.ws_hosts, config: self.config, sessions };
        Ok(Server { state: Arc::new(state) })
    }
}

struct ServerState {
    router: Router,
    default_handler: Option<Box<dyn RequestHandler>>,
    ws_hosts: HashMap<String, Arc<dyn WsHandler>>,
    config: ServerConfig,
    sessions: SessionStore,
}

/// Cheap to clone, clones serve with the same routes and sessions.
#[derive(Clone)]
pub struct Server {
    state: Arc<ServerState>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("config", &self.state.config).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router or websocket host must be set")]
    MissingRouter,

    #[error("invalid router: {reason}")]
    Router { reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bind server error: {source}")]
    Bind { source: std::io::Error },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.state.sessions
    }

    /// Binds the configured address and serves until the process ends.
    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "tracing subscriber already installed");
        }

        let address = self.state.config.socket_addrs()?;
        info!("start listening at {:?}", address);
        let tcp_listener = TcpListener::bind(address.as_slice()).await.map_err(|source| ServerError::Bind { source })?;
        self.serve(tcp_listener).await
    }

    /// Accept loop over an already bound listener.
    pub async fn serve(self, tcp_listener: TcpListener) -> Result<(), ServerError> {
        let listen_addr = tcp_listener.local_addr().map_err(|source| ServerError::Bind { source })?;

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let local_addr = tcp_stream.local_addr().unwrap_or(listen_addr);
            let server = self.clone();
            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                server.serve_connection(reader, writer, remote_addr, local_addr).await;
            });
        }
    }

    /// Serves one client connection: HTTP requests until it closes, or a WebSocket
    /// session when the client upgrades.
    pub async fn serve_connection<R, W>(&self, reader: R, writer: W, remote_addr: SocketAddr, local_addr: SocketAddr)
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let peer = Peer { remote_addr, local_addr };
        let dispatch = Arc::new(HttpDispatch { state: Arc::clone(&self.state), peer });

        match HttpConnection::new(reader, writer).process(dispatch).await {
            Ok(ConnectionOutcome::Closed) => debug!(remote = %remote_addr, "finished process, connection shutdown"),
            Ok(ConnectionOutcome::Upgrade(upgraded)) => {
                let state = &self.state;
                let handler = state.ws_hosts.get(upgraded.header.uri().path()).cloned();
                if let Err(e) = ws::serve_upgrade(upgraded, handler, &state.config, &state.sessions, peer).await {
                    error!(cause = %e, remote = %remote_addr, "websocket connection shutdown");
                }
            }
            Err(e) => error!(cause = %e, remote = %remote_addr, "service has error, connection shutdown"),
        }
    }
}

/// Serves the HTTP requests of one connection.
struct HttpDispatch {
    state: Arc<ServerState>,
    peer: Peer,
}

#[async_trait]
impl Handler for HttpDispatch {
    type RespBody = ResponseBody;
    type Error = Box<dyn Error + Send + Sync>;

    async fn call(&self, req: HttpRequest<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        let state = &self.state;
        let (parts, body) = req.into_parts();
        let header = RequestHeader::from(parts);

        let route = state.router.at(header.uri().path(), header.method());
        let handler: &dyn RequestHandler = match (route.handler(), &state.default_handler) {
            (Some(handler), _) => handler,
            (None, Some(default_handler)) => default_handler.as_ref(),
            (None, None) => {
                debug!(path = header.uri().path(), "no handler matched");
                return Ok(status_response(StatusCode::NOT_FOUND));
            }
        };
        let path_params = route.into_params();

        let content_type = header.header_str(CONTENT_TYPE).map(str::to_string);
        let connection = Connection::new(header, self.peer.remote_addr, self.peer.local_addr, state.config.secure, state.sessions.clone());
        connection.renew_session();

        let form = match read_form(content_type.as_deref(), body, state.config.message_limit).await {
            Ok(form) => form,
            Err(e) => {
                warn!(cause = %e, path = connection.path(), "can't read request body");
                return Ok(status_response(e.status()));
            }
        };

        let request = Request::new(connection, form, path_params);
        let mut response = handler.invoke(request.clone()).await?;

        if let Some(cookie) = request.connection().session_cookie(state.config.domain.as_deref()) {
            response.headers_mut().append(SET_COOKIE, HeaderValue::from_str(&cookie)?);
        }
        Ok(response)
    }
}
