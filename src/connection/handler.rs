//! Connection Handler Module
//!
//! Runs one client's command loop. Each client gets its own task that
//! decodes a command, routes it, writes the replies and goes back to
//! reading.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Server accepts the socket and registers it
//!        │
//!        ▼
//! 2. ConnectionHandler spawned with a fresh Session
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  close requested? ──yes──────┼──▶ 5
//!    │        │ no                  │
//!    │        ▼                     │
//!    │  Decode next command ──err───┼──▶ 4
//!    │        │                     │
//!    │        ▼                     │
//!    │  Router::serve ──────err─────┼──▶ 4
//!    │        │                     │
//!    │        ▼                     │
//!    │  Write replies, flush ─close─┼──▶ 5
//!    │        │                     │
//!    │   [Loop back]                │
//!    └──────────────────────────────┘
//!
//! 4. Error handler runs once (logs, may queue a reply)
//!        │
//!        ▼
//! 5. Flush (bounded by the flush deadline) and close
//! ```
//!
//! Replies for one command are flushed before the next command is read, so
//! pipelined clients see replies in request order.

use crate::commands::{Responder, Router};
use crate::connection::Session;
use crate::protocol::{ParseError, RespCodec, RespValue};
use crate::DEFAULT_FLUSH_DEADLINE;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn commands(&self) -> u64 {
        self.commands_processed.load(Ordering::Relaxed)
    }
}

/// Errors that end a connection's command loop.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RESP parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A well-formed frame that is not a command array
    #[error("ERR Invalid Request")]
    InvalidRequest,

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial command)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A handler asked the server to shut down
    #[error("Shutdown requested")]
    ShutdownRequested,
}

/// Drives one client connection.
pub struct ConnectionHandler {
    framed: Framed<TcpStream, RespCodec>,
    session: Session,
    close: CancellationToken,
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    /// Creates a handler. Cancelling `close` makes the loop stop before its
    /// next read.
    pub fn new(
        stream: TcpStream,
        session: Session,
        close: CancellationToken,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();
        let codec = RespCodec::new(session.app().config().trace_protocol);

        Self {
            framed: Framed::new(stream, codec),
            session,
            close,
            stats,
        }
    }

    /// Runs the command loop to completion, then flushes and closes the
    /// socket.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let addr = self.session.addr();
        let id = self.session.id();
        info!(client = %addr, id, "Client connected");

        let app = Arc::clone(self.session.app());
        let result = self.main_loop(app.router()).await;

        let mut out = Responder::new();
        if let Err(e) = &result {
            app.router().handle_error(&mut self.session, e, &mut out);
        }

        // Best-effort flush within the deadline, then drop the socket
        let closing = close_with(&mut self.framed, out.take());
        match timeout(DEFAULT_FLUSH_DEADLINE, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(client = %addr, error = %e, "Flush on close failed"),
            Err(_) => debug!(client = %addr, "Flush deadline exceeded, closing"),
        }

        self.stats.connection_closed();
        info!(client = %addr, id, "Client disconnected");
        result
    }

    /// The read-dispatch-respond loop. Returns `Ok` only when closed from
    /// the server side.
    async fn main_loop(&mut self, router: &Router) -> Result<(), ConnectionError> {
        loop {
            let command = tokio::select! {
                biased;
                _ = self.close.cancelled() => {
                    debug!(client = %self.session.addr(), "Close requested");
                    return Ok(());
                }
                frame = self.framed.next() => match frame {
                    Some(frame) => frame?,
                    None => return Err(ConnectionError::ClientDisconnected),
                },
            };

            trace!(client = %self.session.addr(), command = %command, "Dispatching command");

            let mut out = Responder::new();
            let served = router.serve(&mut self.session, &command, &mut out);
            self.stats.command_processed();

            // Close wins over a stalled write
            tokio::select! {
                biased;
                _ = self.close.cancelled() => {
                    debug!(client = %self.session.addr(), "Close requested while writing");
                    return Ok(());
                }
                written = write_replies(&mut self.framed, out.take()) => written?,
            }

            served?;
        }
    }
}

/// Writes one command's replies and flushes them.
async fn write_replies(
    framed: &mut Framed<TcpStream, RespCodec>,
    replies: Vec<RespValue>,
) -> Result<(), ConnectionError> {
    for reply in replies {
        framed.feed(reply).await?;
    }
    SinkExt::<RespValue>::flush(framed).await
}

/// Writes the final replies, then flushes and shuts down the write half.
async fn close_with(
    framed: &mut Framed<TcpStream, RespCodec>,
    replies: Vec<RespValue>,
) -> Result<(), ConnectionError> {
    for reply in replies {
        framed.feed(reply).await?;
    }
    SinkExt::<RespValue>::close(framed).await
}

/// Runs a connection to completion, discarding the error that ended it
/// (the router's error handler has already seen it).
pub async fn handle_connection(
    stream: TcpStream,
    session: Session,
    close: CancellationToken,
    stats: Arc<ConnectionStats>,
) {
    let _ = ConnectionHandler::new(stream, session, close, stats)
        .run()
        .await;
}
