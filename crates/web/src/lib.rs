//! HTTP and WebSocket application server built on `strand-http`.
//!
//! HTTP handlers are async functions taking a [`Request`] and returning anything that
//! implements [`Responder`]. WebSocket endpoints implement [`ws::WsHandler`]. Both see
//! the client through a [`Connection`]: cookies, accepted languages, the query string
//! and a lazily created [`Session`] that survives across requests.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use strand_web::router::{get, post};
//! use strand_web::ws::{WsHandler, WsSession};
//! use strand_web::{Request, Router, Server, handler_fn};
//!
//! async fn hello(req: Request) -> String {
//!     let visits = req.session().get_as::<u64>("visits").unwrap_or(0) + 1;
//!     let _ = req.session().set("visits", visits);
//!     format!("hello {}, visit #{visits}", req.param("name").unwrap_or("stranger"))
//! }
//!
//! async fn upload(req: Request) -> String {
//!     req.files().values().map(|file| format!("{} ({} bytes)\n", file.filename(), file.len())).collect()
//! }
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl WsHandler for Echo {
//!     async fn on_event(&self, session: &WsSession, event: &str, data: Value) {
//!         let _ = session.send_event(event, data).await;
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder()
//!         .route("/", get(handler_fn(hello)))
//!         .route("/upload", post(handler_fn(upload)))
//!         .build()
//!         .expect("valid routes");
//!
//!     let server = Server::builder().router(router).ws_host("/ws", Echo).address("127.0.0.1:8080").build().expect("valid server");
//!     if let Err(e) = server.start().await {
//!         eprintln!("server stopped: {e}");
//!     }
//! }
//! ```

mod body;
mod connection;
mod form;
mod handler;
mod request;
mod responder;
mod server;
mod session;

pub mod config;
pub mod router;
pub mod ws;

pub use body::ResponseBody;
pub use config::{ServerConfig, WsMode};
pub use connection::{Connection, Protocol};
pub use form::{FormData, FormError, UploadedFile, read_form};
pub use handler::{FnHandler, RequestHandler, handler_fn};
pub use request::{PathParams, Request};
pub use responder::{Json, Responder};
pub use router::Router;
pub use server::{Server, ServerBuildError, ServerBuilder, ServerError};
pub use session::{Session, SessionStore};
