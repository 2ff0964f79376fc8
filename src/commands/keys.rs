//! Keyspace-wide commands: KEYS, EXISTS, DEL, EXPIRE.

use crate::app::App;
use crate::commands::{parse_int, HandlerResult, Responder};
use crate::connection::Session;
use crate::protocol::Command;

pub fn bind(app: &mut App) {
    app.bind("keys", keys);
    app.bind("exists", exists);
    app.bind("del", del);
    app.bind("expire", expire);
}

/// KEYS pattern
fn keys(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [pattern] => out.result(session.db().keys(pattern), Responder::array),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// EXISTS key [key ...]
fn exists(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    if cmd.args.is_empty() {
        out.arity_error(&cmd.name);
    } else {
        out.count(session.db().exists(&cmd.args));
    }
    Ok(())
}

/// DEL key [key ...]
fn del(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    if cmd.args.is_empty() {
        out.arity_error(&cmd.name);
    } else {
        out.count(session.db().delete(&cmd.args));
    }
    Ok(())
}

/// EXPIRE key seconds
fn expire(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    let [key, seconds] = cmd.args.as_slice() else {
        out.arity_error(&cmd.name);
        return Ok(());
    };

    out.result(parse_int(seconds), |out, seconds| {
        out.integer(session.db().expire(key, seconds) as i64)
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::*;
    use crate::config::Config;
    use crate::protocol::RespValue;

    #[test]
    fn test_exists_and_del() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "SET a 1");
        reply(&mut session, "SET b 2");
        assert_eq!(reply(&mut session, "EXISTS a a b c"), RespValue::integer(3));
        assert_eq!(reply(&mut session, "DEL a a a"), RespValue::integer(1));
        assert_eq!(reply(&mut session, "DEL a b"), RespValue::integer(1));
        assert_eq!(reply(&mut session, "EXISTS a b"), RespValue::integer(0));
        assert!(reply(&mut session, "DEL").is_error());
        assert!(reply(&mut session, "EXISTS").is_error());
    }

    #[test]
    fn test_expire() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "SET a 1");
        assert_eq!(reply(&mut session, "EXPIRE a 100"), RespValue::integer(1));
        assert_eq!(reply(&mut session, "GET a"), bulk("1"));
        assert_eq!(reply(&mut session, "EXPIRE missing 100"), RespValue::integer(0));
        assert_eq!(
            reply(&mut session, "EXPIRE a soon"),
            RespValue::error("ERR value is not an integer or out of range")
        );

        assert_eq!(reply(&mut session, "EXPIRE a 0"), RespValue::integer(1));
        assert_eq!(reply(&mut session, "GET a"), RespValue::null());
    }

    #[test]
    fn test_keys() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "SET user:1 a");
        reply(&mut session, "RPUSH users x");
        assert_eq!(reply(&mut session, "KEYS ^user:"), bulks(&["user:1"]));
        assert_eq!(reply(&mut session, "KEYS nothing"), bulks(&[]));
        assert!(reply(&mut session, "KEYS (").is_error());
        assert!(reply(&mut session, "KEYS").is_error());
    }
}
