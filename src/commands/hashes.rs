//! Hash commands.

use crate::app::App;
use crate::commands::{HandlerResult, Responder};
use crate::connection::Session;
use crate::protocol::Command;

pub fn bind(app: &mut App) {
    app.bind("hset", hset);
    app.bind("hget", hget);
    app.bind("hdel", hdel);
    app.bind("hlen", hlen);
    app.bind("hexists", hexists);
}

fn flag(out: &mut Responder, set: bool) {
    out.integer(set as i64);
}

/// HSET key field value
fn hset(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key, field, value] => out.result(
            session.db().hset(key.clone(), field.clone(), value.clone()),
            flag,
        ),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// HGET key field
fn hget(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key, field] => out.result(session.db().hget(key, field), Responder::optional_bulk),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// HDEL key field [field ...]
fn hdel(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.split_first() {
        Some((key, fields)) if !fields.is_empty() => {
            out.result(session.db().hdel(key, fields), Responder::count)
        }
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// HLEN key
fn hlen(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key] => out.result(session.db().hlen(key), Responder::count),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// HEXISTS key field
fn hexists(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key, field] => out.result(session.db().hexists(key, field), flag),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}
