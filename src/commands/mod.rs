//! Command Module
//!
//! The router and the built-in command handlers.
//!
//! ## Supported Commands
//!
//! ### Connection / Server
//! - `AUTH password` - Unlock the connection when a password is configured
//! - `SELECT index` - Switch the connection's database
//! - `ECHO message`, `PING [message]`
//! - `SHUTDOWN` - Stop the server gracefully
//! - `COMMAND`, `COMMANDS` - List bound command names
//!
//! ### Keys
//! - `KEYS pattern` - Keys matching a regular expression
//! - `EXISTS key [key ...]`, `DEL key [key ...]`
//! - `EXPIRE key seconds`
//!
//! ### Strings
//! - `SET key value`, `GET key`
//!
//! ### Lists
//! - `LPUSH`/`RPUSH key value [value ...]`, `LPOP`/`RPOP key`, `LLEN key`
//! - `LINSERT key BEFORE|AFTER pivot value`
//! - `LINDEX key index`, `LRANGE key start stop`
//!
//! ### Hashes
//! - `HSET key field value`, `HGET key field`, `HDEL key field [field ...]`
//! - `HLEN key`, `HEXISTS key field`

pub mod hashes;
pub mod keys;
pub mod lists;
pub mod router;
pub mod server;
pub mod strings;

pub use router::{
    ErrorHandler, Filter, FilterOutcome, Handler, HandlerResult, Responder, Router,
};

use crate::app::App;
use crate::storage::StoreError;

/// Binds every built-in command, the auth filter and the fallbacks.
pub fn bind_all(app: &mut App) {
    server::bind(app);
    keys::bind(app);
    strings::bind(app);
    lists::bind(app);
    hashes::bind(app);
}

/// Parses a signed integer argument.
pub(crate) fn parse_int(arg: &[u8]) -> Result<i64, StoreError> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::InvalidInteger)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for driving handlers without a socket.

    use super::*;
    use crate::config::Config;
    use crate::connection::{ConnectionError, Session};
    use crate::protocol::{Command, RespValue};
    use bytes::Bytes;
    use std::sync::Arc;

    pub fn app_with(config: Config) -> Arc<App> {
        let mut app = App::new(config);
        bind_all(&mut app);
        Arc::new(app)
    }

    pub fn session(app: &Arc<App>) -> Session {
        Session::new(1, "127.0.0.1:4000".parse().unwrap(), Arc::clone(app)).unwrap()
    }

    /// Parses `"SET a 1"` style text into a command.
    pub fn command(line: &str) -> Command {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        Command::new(name, parts.map(|p| Bytes::copy_from_slice(p.as_bytes())).collect())
    }

    /// Serves one command and returns its replies.
    pub fn run(session: &mut Session, line: &str) -> Result<Vec<RespValue>, ConnectionError> {
        let app = Arc::clone(session.app());
        let mut out = Responder::new();
        app.router().serve(session, &command(line), &mut out)?;
        Ok(out.take())
    }

    /// Serves one command that must produce exactly one reply.
    pub fn reply(session: &mut Session, line: &str) -> RespValue {
        let mut replies = run(session, line).unwrap();
        assert_eq!(replies.len(), 1, "expected one reply to {:?}", line);
        replies.remove(0)
    }

    pub fn bulk(s: &str) -> RespValue {
        RespValue::bulk_string(Bytes::copy_from_slice(s.as_bytes()))
    }

    pub fn bulks(items: &[&str]) -> RespValue {
        RespValue::array(items.iter().map(|s| bulk(s)).collect())
    }
}
