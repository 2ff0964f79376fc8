//! Connection and server commands, the auth filter and the fallback handlers.

use crate::app::App;
use crate::commands::{FilterOutcome, HandlerResult, Responder};
use crate::connection::{ConnectionError, Session};
use crate::protocol::{Command, RespValue};
use bytes::Bytes;
use std::io;
use tracing::{debug, info, warn};

pub fn bind(app: &mut App) {
    app.bind_filter(auth_filter);
    app.bind("auth", auth);
    app.bind("select", select);
    app.bind("echo", echo);
    app.bind("ping", ping);
    app.bind("shutdown", shutdown);
    app.bind("command", command);
    app.bind("commands", command);

    app.bind_not_found(unknown_command);
    app.bind_error(log_error);
}

/// Rejects everything but `AUTH` until the session has authenticated.
fn auth_filter(
    session: &mut Session,
    cmd: &Command,
    out: &mut Responder,
) -> Result<FilterOutcome, ConnectionError> {
    if cmd.name != "auth" && !session.is_authenticated() {
        out.error("NOAUTH Authentication required.");
        return Ok(FilterOutcome::Handled);
    }
    Ok(FilterOutcome::Continue)
}

/// AUTH password
fn auth(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    let [password] = cmd.args.as_slice() else {
        out.arity_error(&cmd.name);
        return Ok(());
    };

    let granted = session.app().check_auth(password);
    session.set_authenticated(granted);
    if granted {
        out.ok();
    } else {
        debug!(client = %session.addr(), "Invalid password");
        out.error("ERR invalid password");
    }
    Ok(())
}

/// SELECT index
fn select(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    let [index] = cmd.args.as_slice() else {
        out.arity_error(&cmd.name);
        return Ok(());
    };

    match session.app().select(index) {
        Ok(db) => {
            session.select(db);
            out.ok();
        }
        Err(e) => out.error(e),
    }
    Ok(())
}

/// ECHO message
fn echo(_session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [message] => out.bulk(message.clone()),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// PING [message]
fn ping(_session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [] => out.push(RespValue::pong()),
        [message] => out.bulk(message.clone()),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// SHUTDOWN
///
/// Signals the process to shut down and ends this connection's loop.
fn shutdown(session: &mut Session, _cmd: &Command, _out: &mut Responder) -> HandlerResult {
    info!(client = %session.addr(), "SHUTDOWN requested by client");
    session.app().request_shutdown();
    Err(ConnectionError::ShutdownRequested)
}

/// COMMAND / COMMANDS
fn command(session: &mut Session, _cmd: &Command, out: &mut Responder) -> HandlerResult {
    let names: Vec<Bytes> = session
        .app()
        .commands()
        .iter()
        .map(|name| Bytes::copy_from_slice(name.as_bytes()))
        .collect();
    out.array(names);
    Ok(())
}

fn unknown_command(_session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    out.error(format_args!("ERR unknown command '{}'", cmd.name));
    Ok(())
}

/// Logs the error that ended a connection. Malformed requests get an error
/// reply before the connection closes.
fn log_error(session: &mut Session, error: &ConnectionError, out: &mut Responder) {
    match error {
        ConnectionError::ClientDisconnected | ConnectionError::ShutdownRequested => {
            debug!(client = %session.addr(), reason = %error, "Connection loop ended")
        }
        ConnectionError::Io(e) if e.kind() == io::ErrorKind::ConnectionReset => {
            debug!(client = %session.addr(), "Connection reset by client")
        }
        ConnectionError::InvalidRequest => {
            warn!(client = %session.addr(), "Invalid request");
            out.error(error);
        }
        ConnectionError::Parse(e) => {
            warn!(client = %session.addr(), error = %e, "Protocol error");
            out.error(format_args!("ERR Protocol error: {}", e));
        }
        _ => warn!(client = %session.addr(), error = %error, "Connection error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::*;
    use crate::config::Config;
    use crate::protocol::ParseError;

    fn secured() -> Config {
        Config {
            auth: Some("sekrit".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_ping_and_echo() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        assert_eq!(reply(&mut session, "PING"), RespValue::pong());
        assert_eq!(reply(&mut session, "ping hello"), bulk("hello"));
        assert_eq!(
            reply(&mut session, "PING a b"),
            RespValue::error("ERR wrong number of arguments for 'ping' command")
        );
        assert_eq!(reply(&mut session, "ECHO hi"), bulk("hi"));
        assert!(reply(&mut session, "ECHO").is_error());
    }

    #[test]
    fn test_auth_gate() {
        let app = app_with(secured());
        let mut session = session(&app);

        assert_eq!(
            reply(&mut session, "GET a"),
            RespValue::error("NOAUTH Authentication required.")
        );
        assert_eq!(
            reply(&mut session, "AUTH wrong"),
            RespValue::error("ERR invalid password")
        );
        assert_eq!(reply(&mut session, "AUTH sekrit"), RespValue::ok());
        assert_eq!(reply(&mut session, "GET a"), RespValue::null());

        // a failed AUTH locks the session again
        reply(&mut session, "AUTH wrong");
        assert!(reply(&mut session, "PING").is_error());
    }

    #[test]
    fn test_auth_without_password_configured() {
        let app = app_with(Config::default());
        let mut session = session(&app);
        assert_eq!(reply(&mut session, "AUTH anything"), RespValue::ok());
        assert_eq!(reply(&mut session, "PING"), RespValue::pong());
    }

    #[test]
    fn test_select_switches_database() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "SET k zero");
        assert_eq!(reply(&mut session, "SELECT 1"), RespValue::ok());
        assert_eq!(session.db().index(), 1);
        assert_eq!(reply(&mut session, "GET k"), RespValue::null());

        assert_eq!(
            reply(&mut session, "SELECT 16"),
            RespValue::error("ERR invalid DB index")
        );
        assert_eq!(
            reply(&mut session, "SELECT one"),
            RespValue::error("ERR invalid DB index")
        );
        assert_eq!(session.db().index(), 1);

        reply(&mut session, "SELECT 0");
        assert_eq!(reply(&mut session, "GET k"), bulk("zero"));
    }

    #[test]
    fn test_command_lists_bound_names() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        let RespValue::Array(names) = reply(&mut session, "COMMANDS") else {
            panic!("expected array");
        };
        assert_eq!(names[0], bulk("auth"));
        assert!(names.contains(&bulk("command")));
        assert!(names.contains(&bulk("lrange")));
        assert!(names.contains(&bulk("hexists")));
        assert_eq!(names.len(), app.commands().len());
    }

    #[test]
    fn test_unknown_command() {
        let app = app_with(Config::default());
        let mut session = session(&app);
        assert_eq!(
            reply(&mut session, "FLY away"),
            RespValue::error("ERR unknown command 'fly'")
        );
    }

    #[test]
    fn test_shutdown_ends_loop_and_signals_app() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        assert!(!app.shutdown_requested());
        let result = run(&mut session, "SHUTDOWN");
        assert!(matches!(result, Err(ConnectionError::ShutdownRequested)));
        assert!(app.shutdown_requested());
    }

    #[test]
    fn test_error_handler_replies_to_bad_requests() {
        let app = app_with(Config::default());
        let mut session = session(&app);
        let mut out = Responder::new();

        app.router()
            .handle_error(&mut session, &ConnectionError::InvalidRequest, &mut out);
        app.router().handle_error(
            &mut session,
            &ConnectionError::Parse(ParseError::InvalidBulkLength(-3)),
            &mut out,
        );
        app.router()
            .handle_error(&mut session, &ConnectionError::ClientDisconnected, &mut out);

        let replies = out.take();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0], RespValue::error("ERR Invalid Request"));
        assert!(replies[1].is_error());
    }
}
