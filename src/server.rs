//! Connection Manager
//!
//! Accepts clients, runs one task per connection and shuts everything down
//! gracefully.
//!
//! ```text
//!              ┌──────────── Mutex<ServerState> ────────────┐
//!  accept ───▶ │ running? ──no──▶ drop socket               │
//!              │   │ yes                                    │
//!              │   ▼                                        │
//!              │ register handle ──▶ TaskTracker::spawn     │
//!              └────────────────────────────────────────────┘
//!
//!  shutdown ─▶ running = false, detach registry
//!          ─▶ cancel accept loop, close every detached connection
//!          ─▶ wait for every spawned connection task
//! ```

use crate::app::App;
use crate::connection::{handle_connection, ConnectionStats, Session};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// First sleep after a transient accept error
const ACCEPT_MIN_SLEEP: Duration = Duration::from_millis(10);

/// Upper bound for the accept backoff
const ACCEPT_MAX_SLEEP: Duration = Duration::from_secs(1);

/// Sleep schedule for transient accept errors: doubles from
/// [`ACCEPT_MIN_SLEEP`] up to [`ACCEPT_MAX_SLEEP`], and starts over after a
/// successful accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AcceptBackoff {
    delay: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            delay: ACCEPT_MIN_SLEEP,
        }
    }

    fn reset(&mut self) {
        self.delay = ACCEPT_MIN_SLEEP;
    }

    /// The sleep for this failure. The next one is twice as long, capped.
    fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (delay * 2).min(ACCEPT_MAX_SLEEP);
        delay
    }
}

/// A live connection as seen by the server.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: u64,
    pub addr: SocketAddr,
    close: CancellationToken,
}

impl ConnectionHandle {
    /// Asks the connection's loop to flush and stop.
    pub fn close(&self) {
        self.close.cancel();
    }
}

/// Live connections by id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<u64, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn add(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.id, handle);
    }

    pub fn remove(&mut self, id: u64) -> Option<ConnectionHandle> {
        self.connections.remove(&id)
    }

    /// Takes every registered connection, leaving the registry empty.
    pub fn detach(&mut self) -> HashMap<u64, ConnectionHandle> {
        std::mem::take(&mut self.connections)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.connections.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug)]
struct ServerState {
    running: bool,
    registry: ConnectionRegistry,
}

/// The TCP front end: accept loop, connection registry and shutdown.
///
/// Shared as `Arc<Server>` between the task running [`Server::start`] and
/// whoever calls [`Server::shutdown`].
#[derive(Debug)]
pub struct Server {
    app: Arc<App>,
    next_id: AtomicU64,
    state: Mutex<ServerState>,
    tracker: TaskTracker,
    stop: CancellationToken,
    stats: Arc<ConnectionStats>,
}

impl Server {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            app,
            next_id: AtomicU64::new(0),
            state: Mutex::new(ServerState {
                running: true,
                registry: ConnectionRegistry::default(),
            }),
            tracker: TaskTracker::new(),
            stop: CancellationToken::new(),
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Number of registered live connections.
    pub fn connection_count(&self) -> usize {
        self.state().registry.len()
    }

    /// Ids of the registered live connections, ascending.
    pub fn connection_ids(&self) -> Vec<u64> {
        self.state().registry.ids()
    }

    /// Binds the configured address and serves until shut down.
    pub async fn start(self: &Arc<Self>) -> io::Result<()> {
        let addr = self.app.config().bind_address();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Accepts connections from `listener` until [`Server::shutdown`] is
    /// called or a non-transient accept error occurs.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Listening for client connections on {}", addr);
        }

        let mut backoff = AcceptBackoff::new();
        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    backoff.reset();
                    self.spawn_connection(stream, addr);
                }
                Err(e) if is_transient(&e) => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, retry_in = ?delay, "Transient accept error");
                    tokio::select! {
                        _ = self.stop.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    return Err(e);
                }
            }
        }

        debug!("Accept loop stopped");
        Ok(())
    }

    /// Registers the connection and spawns its command loop, unless the
    /// server is shutting down, in which case the socket is dropped.
    pub fn spawn_connection(self: &Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = match Session::new(id, addr, Arc::clone(&self.app)) {
            Ok(session) => session,
            Err(e) => {
                error!(client = %addr, error = %e, "Failed to create session");
                return;
            }
        };

        let mut state = self.state();
        if !state.running {
            debug!(client = %addr, "Server shutting down, dropping connection");
            return;
        }

        let close = CancellationToken::new();
        state.registry.add(ConnectionHandle {
            id,
            addr,
            close: close.clone(),
        });

        let server = Arc::clone(self);
        self.tracker.spawn(async move {
            handle_connection(stream, session, close, Arc::clone(&server.stats)).await;
            server.state().registry.remove(id);
        });
    }

    /// Stops accepting, closes every live connection and waits for all
    /// connection tasks to finish. Later calls return immediately.
    pub async fn shutdown(&self) {
        let detached = {
            let mut state = self.state();
            if !state.running {
                return;
            }
            state.running = false;
            state.registry.detach()
        };

        info!(connections = detached.len(), "Shutting down server");
        self.stop.cancel();
        for handle in detached.values() {
            handle.close();
        }

        self.tracker.close();
        self.tracker.wait().await;

        info!(
            accepted = self.stats.accepted(),
            commands = self.stats.commands(),
            "Server shutdown complete"
        );
    }
}

/// Accept errors worth retrying: the peer gave up mid-handshake, or the
/// process ran out of file descriptors.
fn is_transient(e: &io::Error) -> bool {
    use io::ErrorKind::*;

    // ENFILE / EMFILE
    matches!(
        e.kind(),
        ConnectionAborted | ConnectionReset | ConnectionRefused | Interrupted | WouldBlock | TimedOut
    ) || matches!(e.raw_os_error(), Some(23) | Some(24))
}
