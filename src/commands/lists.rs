//! List commands.

use crate::app::App;
use crate::commands::{parse_int, HandlerResult, Responder};
use crate::connection::Session;
use crate::protocol::Command;
use crate::storage::InsertPosition;

pub fn bind(app: &mut App) {
    app.bind("lpush", lpush);
    app.bind("rpush", rpush);
    app.bind("lpop", lpop);
    app.bind("rpop", rpop);
    app.bind("llen", llen);
    app.bind("linsert", linsert);
    app.bind("lindex", lindex);
    app.bind("lrange", lrange);
}

/// LPUSH key value [value ...]
fn lpush(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.split_first() {
        Some((key, values)) if !values.is_empty() => out.result(
            session.db().lpush(key.clone(), values.to_vec()),
            Responder::count,
        ),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// RPUSH key value [value ...]
fn rpush(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.split_first() {
        Some((key, values)) if !values.is_empty() => out.result(
            session.db().rpush(key.clone(), values.to_vec()),
            Responder::count,
        ),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// LPOP key
fn lpop(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key] => out.result(session.db().lpop(key), Responder::optional_bulk),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// RPOP key
fn rpop(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key] => out.result(session.db().rpop(key), Responder::optional_bulk),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// LLEN key
fn llen(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key] => out.result(session.db().llen(key), Responder::count),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// LINSERT key BEFORE|AFTER pivot value
fn linsert(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    let [key, position, pivot, value] = cmd.args.as_slice() else {
        out.arity_error(&cmd.name);
        return Ok(());
    };

    let result = InsertPosition::parse(position)
        .and_then(|position| session.db().linsert(key, position, pivot, value.clone()));
    out.result(result, Responder::integer);
    Ok(())
}

/// LINDEX key index
fn lindex(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    let [key, index] = cmd.args.as_slice() else {
        out.arity_error(&cmd.name);
        return Ok(());
    };

    let result = parse_int(index).and_then(|index| session.db().lindex(key, index));
    out.result(result, Responder::optional_bulk);
    Ok(())
}

/// LRANGE key start stop
fn lrange(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    let [key, start, stop] = cmd.args.as_slice() else {
        out.arity_error(&cmd.name);
        return Ok(());
    };

    let result = parse_int(start).and_then(|start| {
        let stop = parse_int(stop)?;
        session.db().lrange(key, start, stop)
    });
    out.result(result, Responder::array);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::*;
    use crate::config::Config;
    use crate::protocol::RespValue;

    #[test]
    fn test_push_range_scenario() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        assert_eq!(reply(&mut session, "LPUSH k x y z"), RespValue::integer(3));
        assert_eq!(reply(&mut session, "RPUSH k p q"), RespValue::integer(5));
        assert_eq!(reply(&mut session, "LLEN k"), RespValue::integer(5));
        assert_eq!(
            reply(&mut session, "LRANGE k 0 -1"),
            bulks(&["z", "y", "x", "p", "q"])
        );
        assert_eq!(reply(&mut session, "LRANGE k -2 -1"), bulks(&["p", "q"]));
        assert_eq!(reply(&mut session, "LINDEX k -1"), bulk("q"));
        assert_eq!(reply(&mut session, "LINDEX k 5"), RespValue::null());
    }

    #[test]
    fn test_pop_until_empty() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "RPUSH k a b");
        assert_eq!(reply(&mut session, "LPOP k"), bulk("a"));
        assert_eq!(reply(&mut session, "RPOP k"), bulk("b"));
        assert_eq!(reply(&mut session, "RPOP k"), RespValue::null());
        assert_eq!(reply(&mut session, "EXISTS k"), RespValue::integer(0));
    }

    #[test]
    fn test_linsert() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "RPUSH k a c");
        assert_eq!(reply(&mut session, "LINSERT k before c b"), RespValue::integer(3));
        assert_eq!(reply(&mut session, "LINSERT k AFTER c d"), RespValue::integer(4));
        assert_eq!(reply(&mut session, "LINSERT k BEFORE nope x"), RespValue::integer(-1));
        assert_eq!(reply(&mut session, "LINSERT missing BEFORE a x"), RespValue::integer(0));
        assert_eq!(
            reply(&mut session, "LINSERT k SIDEWAYS a x"),
            RespValue::error("ERR syntax error")
        );
        assert_eq!(reply(&mut session, "LRANGE k 0 -1"), bulks(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_arity_and_integer_errors() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        assert_eq!(
            reply(&mut session, "LPUSH k"),
            RespValue::error("ERR wrong number of arguments for 'lpush' command")
        );
        assert!(reply(&mut session, "RPUSH").is_error());
        assert!(reply(&mut session, "LINSERT k BEFORE a").is_error());
        assert!(reply(&mut session, "LRANGE k 0").is_error());
        assert_eq!(
            reply(&mut session, "LRANGE k zero -1"),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            reply(&mut session, "LINDEX k x"),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_wrong_type() {
        let app = app_with(Config::default());
        let mut session = session(&app);

        reply(&mut session, "SET s v");
        for line in ["LPUSH s x", "LPOP s", "LLEN s", "LRANGE s 0 -1", "LINDEX s 0"] {
            assert!(reply(&mut session, line).is_error(), "{}", line);
        }
        assert_eq!(reply(&mut session, "GET s"), bulk("v"));
    }
}
