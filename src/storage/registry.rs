//! Database registry backing `SELECT`.

use crate::storage::{Keyspace, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Lazily creates one [`Keyspace`] per database index in `0..databases`.
///
/// A keyspace, once created, stays registered for the life of the process,
/// so every connection selecting the same index shares the same store.
#[derive(Debug)]
pub struct DatabaseRegistry {
    databases: usize,
    dbs: RwLock<HashMap<usize, Arc<Keyspace>>>,
}

impl DatabaseRegistry {
    pub fn new(databases: usize) -> Self {
        Self {
            databases,
            dbs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of selectable databases.
    pub fn databases(&self) -> usize {
        self.databases
    }

    /// Returns the keyspace for `index`, creating it on first use.
    pub fn select(&self, index: i64) -> StoreResult<Arc<Keyspace>> {
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.databases)
            .ok_or(StoreError::InvalidIndex)?;

        if let Some(db) = self
            .dbs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
        {
            return Ok(Arc::clone(db));
        }

        let mut dbs = self.dbs.write().unwrap_or_else(PoisonError::into_inner);
        let db = dbs.entry(index).or_insert_with(|| {
            debug!(index, "Creating database");
            Arc::new(Keyspace::new(index))
        });
        Ok(Arc::clone(db))
    }

    /// Parses a `SELECT` argument and selects that database.
    pub fn select_arg(&self, arg: &[u8]) -> StoreResult<Arc<Keyspace>> {
        let index = std::str::from_utf8(arg)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(StoreError::InvalidIndex)?;
        self.select(index)
    }

    /// Number of databases created so far.
    pub fn created(&self) -> usize {
        self.dbs.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::thread;

    #[test]
    fn test_select_is_lazy_and_stable() {
        let registry = DatabaseRegistry::new(4);
        assert_eq!(registry.created(), 0);

        let first = registry.select(2).unwrap();
        let again = registry.select_arg(b"2").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.index(), 2);
        assert_eq!(registry.created(), 1);
    }

    #[test]
    fn test_select_out_of_range() {
        let registry = DatabaseRegistry::new(4);
        assert_eq!(registry.select(4).unwrap_err(), StoreError::InvalidIndex);
        assert_eq!(registry.select(-1).unwrap_err(), StoreError::InvalidIndex);
        assert_eq!(registry.select_arg(b"abc").unwrap_err(), StoreError::InvalidIndex);
        assert_eq!(registry.select_arg(b"").unwrap_err(), StoreError::InvalidIndex);
        assert_eq!(registry.created(), 0);
    }

    #[test]
    fn test_databases_are_isolated() {
        let registry = DatabaseRegistry::new(2);
        registry.select(0).unwrap().set(Bytes::from("k"), Bytes::from("zero"));
        assert_eq!(registry.select(1).unwrap().get(b"k").unwrap(), None);
        assert_eq!(
            registry.select(0).unwrap().get(b"k").unwrap(),
            Some(Bytes::from("zero"))
        );
    }

    #[test]
    fn test_concurrent_select_creates_once() {
        let registry = Arc::new(DatabaseRegistry::new(16));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.select(7).unwrap())
            })
            .collect();

        let dbs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(dbs.iter().all(|db| Arc::ptr_eq(db, &dbs[0])));
        assert_eq!(registry.created(), 1);
    }
}
