//! String commands: SET, GET.

use crate::app::App;
use crate::commands::{HandlerResult, Responder};
use crate::connection::Session;
use crate::protocol::Command;
use crate::storage::StoreError;

pub fn bind(app: &mut App) {
    app.bind("set", set);
    app.bind("get", get);
}

/// SET key value
///
/// Options such as `EX` or `NX` are not supported and are rejected as a
/// syntax error.
fn set(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key, value] => {
            session.db().set(key.clone(), value.clone());
            out.ok();
        }
        [_, _, ..] => out.error(StoreError::Syntax),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}

/// GET key
fn get(session: &mut Session, cmd: &Command, out: &mut Responder) -> HandlerResult {
    match cmd.args.as_slice() {
        [key] => out.result(session.db().get(key), Responder::optional_bulk),
        _ => out.arity_error(&cmd.name),
    }
    Ok(())
}
