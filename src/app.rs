//! The application object shared by every connection.

use crate::commands::{ErrorHandler, Filter, Handler, Router};
use crate::config::Config;
use crate::storage::{DatabaseRegistry, Keyspace, StoreResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Configuration, databases, the command router and the shutdown signal.
///
/// Commands are bound while the `App` is still owned; once wrapped in an
/// `Arc` and handed to the server it is read-only.
#[derive(Debug)]
pub struct App {
    config: Config,
    registry: DatabaseRegistry,
    router: Router,
    shutdown: CancellationToken,
}

impl App {
    pub fn new(config: Config) -> Self {
        let config = config.normalized();
        Self {
            registry: DatabaseRegistry::new(config.databases),
            router: Router::new(),
            shutdown: CancellationToken::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bind_filter(&mut self, filter: impl Filter + 'static) {
        self.router.bind_filter(filter);
    }

    pub fn bind(&mut self, name: &str, handler: impl Handler + 'static) -> Option<Arc<dyn Handler>> {
        self.router.bind(name, handler)
    }

    pub fn bind_not_found(&mut self, handler: impl Handler + 'static) -> Option<Arc<dyn Handler>> {
        self.router.bind_not_found(handler)
    }

    pub fn bind_error(
        &mut self,
        handler: impl ErrorHandler + 'static,
    ) -> Option<Arc<dyn ErrorHandler>> {
        self.router.bind_error(handler)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Names of every bound command.
    pub fn commands(&self) -> &[String] {
        self.router.command_names()
    }

    pub fn requires_auth(&self) -> bool {
        self.config.requires_auth()
    }

    /// Checks a password sent with `AUTH`. Always succeeds when no password
    /// is configured.
    pub fn check_auth(&self, password: &[u8]) -> bool {
        match &self.config.auth {
            Some(expected) => expected.as_bytes() == password,
            None => true,
        }
    }

    /// Selects a database by its textual index.
    pub fn select(&self, index: &[u8]) -> StoreResult<Arc<Keyspace>> {
        self.registry.select_arg(index)
    }

    pub fn select_index(&self, index: i64) -> StoreResult<Arc<Keyspace>> {
        self.registry.select(index)
    }

    pub fn registry(&self) -> &DatabaseRegistry {
        &self.registry
    }

    /// Asks the process to shut down. Safe to call more than once.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once [`App::request_shutdown`] has been called.
    pub async fn wait_for_shutdown(&self) {
        self.shutdown.cancelled().await
    }
}
