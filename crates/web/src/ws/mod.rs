//! WebSocket endpoints.
//!
//! A [`WsHandler`] registered for a path receives the connections upgraded on it. Each
//! connection gets a [`WsSession`] handle for sending; in advanced mode text messages
//! are JSON events dispatched to [`WsHandler::on_event`], in raw mode every message
//! goes to [`WsHandler::on_message`].

mod connection;
mod handler;
mod session;
mod upgrade;

pub use handler::{WsFailure, WsHandler};
pub use session::{WsSendError, WsSession};

pub(crate) use upgrade::{Peer, serve_upgrade};
