//! The WebSocket connection loop.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures::{FutureExt, SinkExt};
use serde::Deserialize;
use serde_json::Value;
use strand_http::codec::websocket::{DecodeStep, WsDecoder, WsEncoder};
use strand_http::protocol::{WsError, WsEvent, WsFrame, WsMessage};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tracing::{debug, error, trace, warn};

use super::{WsFailure, WsHandler, WsSession};
use crate::config::{ServerConfig, WsMode};

/// A structured message sent by the client in advanced mode.
#[derive(Deserialize)]
struct IncomingEvent {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Writes server frames, nothing is written after a close frame.
struct Outbound<W> {
    writer: FramedWrite<W, WsEncoder>,
    frames: mpsc::Receiver<WsFrame>,
    closed: bool,
}

impl<W> Outbound<W>
where
    W: AsyncWrite + Unpin,
{
    async fn write(&mut self, frame: WsFrame) -> Result<(), WsError> {
        if self.closed {
            return Ok(());
        }
        let is_close = frame == WsFrame::Close;
        self.writer.send(frame).await?;
        self.closed = is_close;
        Ok(())
    }

    /// Runs one handler callback while writing the frames it queues. Frames still
    /// queued when it returns are written before this does. A panic inside the
    /// callback is caught and returned as a failure.
    async fn run_callback<F>(&mut self, callback: F) -> Result<Option<WsFailure>, WsError>
    where
        F: Future<Output = ()>,
    {
        let callback = AssertUnwindSafe(callback).catch_unwind();
        tokio::pin!(callback);

        let result = loop {
            select! {
                biased;
                result = &mut callback => break result,
                Some(frame) = self.frames.recv() => self.write(frame).await?,
            }
        };

        while let Ok(frame) = self.frames.try_recv() {
            self.write(frame).await?;
        }
        Ok(result.err().map(panic_failure))
    }
}

fn panic_failure(panic: Box<dyn Any + Send>) -> WsFailure {
    let message = panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    WsFailure::Panic { message }
}

/// One upgraded connection: reads client frames, dispatches messages to the
/// [`WsHandler`], writes queued frames and pings the client when it goes quiet.
pub(crate) struct WsConnection<R, W> {
    reader: R,
    read_buf: BytesMut,
    decoder: WsDecoder,
    outbound: Outbound<W>,
    handler: Arc<dyn WsHandler>,
    session: WsSession,
    mode: WsMode,
    keep_alive: Duration,
}

impl<R, W> WsConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(
        reader: R,
        writer: W,
        read_buf: BytesMut,
        handler: Arc<dyn WsHandler>,
        session: WsSession,
        frames: mpsc::Receiver<WsFrame>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            reader,
            read_buf,
            decoder: WsDecoder::new(config.message_limit),
            outbound: Outbound { writer: FramedWrite::new(writer, WsEncoder), frames, closed: false },
            handler,
            session,
            mode: config.ws_mode,
            keep_alive: config.keep_alive_interval(),
        }
    }

    /// Serves the connection until either side closes it. A fatal failure is handed to
    /// `on_error` before the close frame goes out, `on_close` always runs last.
    pub(crate) async fn run(mut self) -> Result<(), WsFailure> {
        let result = self.serve().await;

        if let Err(failure) = &result {
            error!(cause = %failure, "websocket connection failed");
            if let Err(e) = self.report(failure).await {
                debug!(cause = %e, "can't report websocket failure");
            }
            if let Err(e) = self.outbound.write(WsFrame::Close).await {
                debug!(cause = %e, "can't send close frame");
            }
        }

        match self.outbound.run_callback(self.handler.on_close(&self.session)).await {
            Ok(Some(panic)) => error!(cause = %panic, "websocket close handler failed"),
            Ok(None) => {}
            Err(e) => debug!(cause = %e, "write during close handler failed"),
        }

        debug!("websocket connection closed");
        result
    }

    async fn serve(&mut self) -> Result<(), WsFailure> {
        if let Some(failure) = self.outbound.run_callback(self.handler.on_open(&self.session)).await? {
            self.report(&failure).await?;
        }

        loop {
            if self.outbound.closed {
                return Ok(());
            }

            match self.decoder.decode_step(&mut self.read_buf)? {
                DecodeStep::Event(event) => {
                    self.on_event(event).await?;
                    continue;
                }
                // let other connections run between two slices of a large frame
                DecodeStep::Yield => {
                    tokio::task::yield_now().await;
                    continue;
                }
                DecodeStep::NeedMore => {}
            }

            select! {
                biased;
                Some(frame) = self.outbound.frames.recv() => self.outbound.write(frame).await?,
                read = self.reader.read_buf(&mut self.read_buf) => {
                    if read.map_err(WsError::from)? == 0 {
                        debug!("client closed the socket");
                        return Ok(());
                    }
                }
                () = tokio::time::sleep(self.keep_alive) => {
                    trace!("client idle, sending keep-alive ping");
                    self.outbound.write(WsFrame::keep_alive()).await?;
                }
            }
        }
    }

    async fn on_event(&mut self, event: WsEvent) -> Result<(), WsFailure> {
        match event {
            WsEvent::Ping(payload) => self.outbound.write(WsFrame::Pong(payload)).await?,
            WsEvent::Close => {
                debug!("received close frame");
                self.outbound.write(WsFrame::Close).await?;
            }
            WsEvent::Message(message) => self.dispatch(message).await?,
        }
        Ok(())
    }

    async fn dispatch(&mut self, message: WsMessage) -> Result<(), WsError> {
        let failure = match (self.mode, message) {
            (WsMode::Advanced, WsMessage::Text(text)) => match serde_json::from_str::<IncomingEvent>(&text) {
                Ok(IncomingEvent { event, data }) => {
                    trace!(event = %event, "dispatching websocket event");
                    self.outbound.run_callback(self.handler.on_event(&self.session, &event, data)).await?
                }
                Err(e) => {
                    warn!(cause = %e, "invalid structured websocket message");
                    Some(WsFailure::from(e))
                }
            },
            (_, message) => self.outbound.run_callback(self.handler.on_message(&self.session, message)).await?,
        };

        if let Some(failure) = failure {
            self.report(&failure).await?;
        }
        Ok(())
    }

    async fn report(&mut self, failure: &WsFailure) -> Result<(), WsError> {
        if let Some(panic) = self.outbound.run_callback(self.handler.on_error(&self.session, failure)).await? {
            error!(cause = %panic, "websocket error handler failed");
        }
        Ok(())
    }
}
