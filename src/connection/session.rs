//! Per-connection state.

use crate::app::App;
use crate::storage::{Keyspace, StoreResult};
use std::net::SocketAddr;
use std::sync::Arc;

/// State owned by one connection's command loop: the selected database and
/// whether the client has authenticated.
#[derive(Debug)]
pub struct Session {
    id: u64,
    addr: SocketAddr,
    app: Arc<App>,
    db: Arc<Keyspace>,
    authenticated: bool,
}

impl Session {
    /// Creates a session on database 0. Sessions start authenticated only
    /// when the server has no password configured.
    pub fn new(id: u64, addr: SocketAddr, app: Arc<App>) -> StoreResult<Self> {
        let db = app.select_index(0)?;
        Ok(Self {
            id,
            addr,
            authenticated: !app.requires_auth(),
            app,
            db,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// The currently selected database.
    pub fn db(&self) -> &Arc<Keyspace> {
        &self.db
    }

    pub fn select(&mut self, db: Arc<Keyspace>) {
        self.db = db;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_new_session_defaults() {
        let app = Arc::new(App::new(Config::default()));
        let session = Session::new(7, "10.0.0.1:5000".parse().unwrap(), Arc::clone(&app)).unwrap();

        assert_eq!(session.id(), 7);
        assert_eq!(session.db().index(), 0);
        assert!(session.is_authenticated());
        assert!(Arc::ptr_eq(session.db(), &app.select_index(0).unwrap()));
    }

    #[test]
    fn test_password_locks_new_sessions() {
        let app = Arc::new(App::new(Config {
            auth: Some("pw".to_string()),
            ..Config::default()
        }));
        let mut session = Session::new(1, "10.0.0.1:5000".parse().unwrap(), app).unwrap();
        assert!(!session.is_authenticated());

        session.set_authenticated(true);
        assert!(session.is_authenticated());
    }
}
