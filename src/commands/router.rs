//! Command Router
//!
//! Resolves each decoded [`Command`] to a handler:
//!
//! ```text
//!  Command ──▶ filter 1 ──▶ filter 2 ──▶ ... ──▶ routes[name] ──▶ Responder
//!                 │             │                    │
//!              Handled       Handled            not found ──▶ not-found handler
//!                 ▼             ▼
//!              (stop)        (stop)
//! ```
//!
//! Filters, handlers and the error handler are trait objects. Plain
//! functions and closures with the matching signature implement the traits
//! automatically, so most handlers are just `fn`s.

use crate::connection::{ConnectionError, Session};
use crate::protocol::{Command, RespValue};
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a handler returns: `Ok` keeps the connection going, `Err` ends it.
pub type HandlerResult = Result<(), ConnectionError>;

/// Result of running a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Pass the command on to the next filter or the handler.
    Continue,
    /// The filter answered the command itself; stop here.
    Handled,
}

/// Pre-command hook run before every command, in binding order.
pub trait Filter: Send + Sync {
    fn filter(
        &self,
        session: &mut Session,
        command: &Command,
        out: &mut Responder,
    ) -> Result<FilterOutcome, ConnectionError>;
}

impl<F> Filter for F
where
    F: Fn(&mut Session, &Command, &mut Responder) -> Result<FilterOutcome, ConnectionError>
        + Send
        + Sync,
{
    fn filter(
        &self,
        session: &mut Session,
        command: &Command,
        out: &mut Responder,
    ) -> Result<FilterOutcome, ConnectionError> {
        self(session, command, out)
    }
}

/// Executes one command.
pub trait Handler: Send + Sync {
    fn handle(&self, session: &mut Session, command: &Command, out: &mut Responder)
        -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Session, &Command, &mut Responder) -> HandlerResult + Send + Sync,
{
    fn handle(
        &self,
        session: &mut Session,
        command: &Command,
        out: &mut Responder,
    ) -> HandlerResult {
        self(session, command, out)
    }
}

/// Called once when a connection's loop ends with an error.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, session: &mut Session, error: &ConnectionError, out: &mut Responder);
}

impl<F> ErrorHandler for F
where
    F: Fn(&mut Session, &ConnectionError, &mut Responder) + Send + Sync,
{
    fn handle_error(&self, session: &mut Session, error: &ConnectionError, out: &mut Responder) {
        self(session, error, out)
    }
}

/// Collects the replies a command produces until the connection writes them.
#[derive(Debug, Default)]
pub struct Responder {
    replies: Vec<RespValue>,
}

impl Responder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reply: RespValue) {
        self.replies.push(reply);
    }

    pub fn ok(&mut self) {
        self.push(RespValue::ok());
    }

    /// Queues an error reply. The text is sent as-is, prefix included.
    pub fn error(&mut self, message: impl fmt::Display) {
        self.push(RespValue::error(message.to_string()));
    }

    pub fn arity_error(&mut self, command: &str) {
        self.error(format_args!(
            "ERR wrong number of arguments for '{}' command",
            command
        ));
    }

    pub fn integer(&mut self, n: i64) {
        self.push(RespValue::integer(n));
    }

    pub fn bulk(&mut self, data: Bytes) {
        self.push(RespValue::bulk_string(data));
    }

    /// A bulk string, or the nil bulk when absent.
    pub fn optional_bulk(&mut self, data: Option<Bytes>) {
        self.push(RespValue::optional_bulk(data));
    }

    pub fn nil(&mut self) {
        self.push(RespValue::null());
    }

    pub fn array<I>(&mut self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        self.push(RespValue::bulk_array(items));
    }

    /// Replies through `reply` on success, or with the error text on failure.
    pub fn result<T, E: fmt::Display>(
        &mut self,
        result: Result<T, E>,
        reply: impl FnOnce(&mut Self, T),
    ) {
        match result {
            Ok(value) => reply(self, value),
            Err(e) => self.error(e),
        }
    }

    /// Replies with a count.
    pub fn count(&mut self, n: usize) {
        self.integer(i64::try_from(n).unwrap_or(i64::MAX));
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Takes every queued reply, leaving the responder empty.
    pub fn take(&mut self) -> Vec<RespValue> {
        std::mem::take(&mut self.replies)
    }
}

/// Maps command names to handlers and runs filters in front of them.
///
/// Built once at startup and shared read-only by every connection.
#[derive(Default)]
pub struct Router {
    filters: Vec<Box<dyn Filter>>,
    routes: HashMap<String, Arc<dyn Handler>>,
    names: Vec<String>,
    not_found: Option<Arc<dyn Handler>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter. Filters run in the order they were bound.
    pub fn bind_filter(&mut self, filter: impl Filter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Binds `handler` to `name` (case-insensitive) and returns the handler
    /// it replaced, if any.
    pub fn bind(
        &mut self,
        name: &str,
        handler: impl Handler + 'static,
    ) -> Option<Arc<dyn Handler>> {
        let name = name.to_ascii_lowercase();
        let previous = self.routes.insert(name.clone(), Arc::new(handler));
        if previous.is_none() {
            self.names.push(name);
        }
        previous
    }

    /// Sets the handler for unbound commands, returning the previous one.
    pub fn bind_not_found(
        &mut self,
        handler: impl Handler + 'static,
    ) -> Option<Arc<dyn Handler>> {
        self.not_found.replace(Arc::new(handler))
    }

    /// Sets the handler for loop-ending errors, returning the previous one.
    pub fn bind_error(
        &mut self,
        handler: impl ErrorHandler + 'static,
    ) -> Option<Arc<dyn ErrorHandler>> {
        self.error_handler.replace(Arc::new(handler))
    }

    /// Runs the filters, then the handler bound to the command's name.
    ///
    /// A filter error aborts the command and is returned to the caller. With
    /// no route and no not-found handler the command is silently ignored.
    pub fn serve(
        &self,
        session: &mut Session,
        command: &Command,
        out: &mut Responder,
    ) -> HandlerResult {
        for filter in &self.filters {
            if filter.filter(session, command, out)? == FilterOutcome::Handled {
                return Ok(());
            }
        }

        match self.routes.get(&command.name).or(self.not_found.as_ref()) {
            Some(handler) => handler.handle(session, command, out),
            None => Ok(()),
        }
    }

    /// Passes a loop-ending error to the error handler, if one is bound.
    pub fn handle_error(&self, session: &mut Session, error: &ConnectionError, out: &mut Responder) {
        if let Some(handler) = &self.error_handler {
            handler.handle_error(session, error, out);
        }
    }

    /// Bound command names, in the order they were first bound.
    pub fn command_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(&name.to_ascii_lowercase())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("filters", &self.filters.len())
            .field("routes", &self.names)
            .field("not_found", &self.not_found.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}
