//! Connection Module
//!
//! Per-client sessions and the command loop that serves them. Each client
//! connection is handled by its own async task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Server (accept loop)                    │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ register + spawn
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ RespCodec   │───>│   Router    │───>│  Responder  │      │
//! │  │  (decode)   │    │  (Session)  │    │  (encode)   │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Tokio sockets wrapped in a `tokio_util` `Framed`
//! - **Pipelining**: several commands in one packet are answered in order
//! - **Cooperative close**: the server cancels a token; the loop stops before
//!   its next read and flushes what it has
//! - **Statistics**: connection and command counters

pub mod handler;
pub mod session;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
pub use session::Session;
