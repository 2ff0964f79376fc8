//! Storage Module
//!
//! In-memory databases for multikv.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               DatabaseRegistry               │
//! │   index ──▶ Arc<Keyspace> (created lazily)   │
//! │  ┌──────────┐ ┌──────────┐     ┌──────────┐  │
//! │  │  db 0    │ │  db 1    │ ... │  db N-1  │  │
//! │  │  RwLock  │ │  RwLock  │     │  RwLock  │  │
//! │  │  HashMap │ │  HashMap │     │  HashMap │  │
//! │  └──────────┘ └──────────┘     └──────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Typed values**: strings, lists and hashes under one key space
//! - **RwLock per database**: concurrent readers, exclusive writers
//! - **Lazy expiry**: expired keys are evicted by whichever operation finds them
//!
//! ## Example
//!
//! ```
//! use multikv::storage::DatabaseRegistry;
//! use bytes::Bytes;
//!
//! let registry = DatabaseRegistry::new(16);
//! let db = registry.select(3).unwrap();
//!
//! db.hset(Bytes::from("user:1"), Bytes::from("name"), Bytes::from("ada")).unwrap();
//! assert_eq!(db.hlen(b"user:1").unwrap(), 1);
//!
//! assert!(registry.select(16).is_err());
//! ```

pub mod keyspace;
pub mod registry;
pub mod value;

pub use keyspace::{Keyspace, StoreError, StoreResult};
pub use registry::DatabaseRegistry;
pub use value::{Entry, InsertPosition, Value};
