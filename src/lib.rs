//! # MultiKV - A Multi-Database In-Memory Key-Value Server
//!
//! MultiKV speaks the Redis serialization protocol (RESP) and keeps a fixed
//! number of independent, numbered databases in memory. Each database holds
//! strings, lists and hashes, with optional per-key expiry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                               MultiKV                                │
//! │                                                                      │
//! │  ┌─────────────┐    ┌──────────────────┐    ┌──────────────────┐     │
//! │  │   Server    │───>│ ConnectionHandler│───>│      Router      │     │
//! │  │ (accept +   │    │  Framed<RespCodec>│   │ filters, routes, │     │
//! │  │  registry)  │    │  + Session        │   │ not-found, error │     │
//! │  └─────────────┘    └──────────────────┘    └────────┬─────────┘     │
//! │                                                      │               │
//! │                                                      ▼               │
//! │                     ┌────────────────────────────────────────────┐   │
//! │                     │             DatabaseRegistry               │   │
//! │                     │  ┌──────────┐ ┌──────────┐     ┌──────────┐│   │
//! │                     │  │Keyspace 0│ │Keyspace 1│ ... │Keyspace N││   │
//! │                     │  │ RwLock   │ │ RwLock   │     │ RwLock   ││   │
//! │                     │  └──────────┘ └──────────┘     └──────────┘│   │
//! │                     └────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Databases are created the first time a client selects them. Expired keys
//! are removed lazily, when a command touches them or when `KEYS` scans.
//!
//! ## Quick Start
//!
//! ```no_run
//! use multikv::{commands, App, Config, Server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut app = App::new(Config::default());
//!     commands::bind_all(&mut app);
//!
//!     let server = Arc::new(Server::new(Arc::new(app)));
//!     let serving = {
//!         let server = Arc::clone(&server);
//!         tokio::spawn(async move { server.start().await })
//!     };
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     let _ = serving.await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP values, parser and the framed codec
//! - [`storage`]: keyspaces and the database registry
//! - [`commands`]: the router and every command handler
//! - [`connection`]: per-client sessions and the command loop
//! - [`server`]: accept loop, connection registry and graceful shutdown
//! - [`config`]: command-line and environment configuration

pub mod app;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use app::App;
pub use commands::{Responder, Router};
pub use config::Config;
pub use connection::{handle_connection, ConnectionError, ConnectionStats, Session};
pub use protocol::{Command, ParseError, RespCodec, RespParser, RespValue};
pub use server::Server;
pub use storage::{DatabaseRegistry, Keyspace, StoreError};

use std::time::Duration;

/// The default port MultiKV listens on
pub const DEFAULT_PORT: u16 = 16379;

/// The default host MultiKV binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Number of databases when none is configured
pub const DEFAULT_DATABASES: usize = 16;

/// How long a closing connection may spend flushing pending replies
pub const DEFAULT_FLUSH_DEADLINE: Duration = Duration::from_secs(2);

/// Version of MultiKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
