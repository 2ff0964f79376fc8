//! Per-Database Keyspace
//!
//! A `Keyspace` maps keys to type-tagged values behind a single `RwLock`.
//! Expired entries are never visible: every operation that touches one
//! evicts it first.
//!
//! ## Lazy Expiry
//!
//! Read paths take the shared lock and answer directly when the entry is
//! live. Only when an expired entry is found do they upgrade to the
//! exclusive lock, re-check (a writer may have replaced the entry in
//! between), evict, and answer from the fresh state.
//!
//! ```text
//!   read lock ──▶ live? ──yes──▶ answer
//!                   │
//!                   no (expired)
//!                   ▼
//!   write lock ──▶ still expired? ──yes──▶ remove
//!                   │                        │
//!                   └────────────▶ answer ◀──┘
//! ```

use crate::storage::value::{Entry, InsertPosition, Value};
use bytes::Bytes;
use regex::bytes::Regex;
use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors surfaced by keyspace and registry operations.
///
/// The `Display` text is exactly what goes on the wire after the `-`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR invalid DB index")]
    InvalidIndex,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("ERR value is not an integer or out of range")]
    InvalidInteger,
}

pub type StoreResult<T> = Result<T, StoreError>;

type Entries = HashMap<Bytes, Entry>;

/// One database's key space.
///
/// Shared between connections behind an `Arc`; all methods take `&self`.
///
/// # Example
///
/// ```
/// use multikv::storage::Keyspace;
/// use bytes::Bytes;
///
/// let db = Keyspace::new(0);
/// db.set(Bytes::from("name"), Bytes::from("multikv"));
/// assert_eq!(db.get(b"name").unwrap(), Some(Bytes::from("multikv")));
///
/// db.rpush(Bytes::from("queue"), vec![Bytes::from("a"), Bytes::from("b")]).unwrap();
/// assert_eq!(db.lrange(b"queue", 0, -1).unwrap().len(), 2);
///
/// // A string key cannot be used as a list
/// assert!(db.llen(b"name").is_err());
/// ```
#[derive(Debug)]
pub struct Keyspace {
    index: usize,
    entries: RwLock<Entries>,
}

impl Keyspace {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The database index this keyspace was created for.
    pub fn index(&self) -> usize {
        self.index
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the live value for `key`, evicting it first if it
    /// has expired.
    fn view<T>(&self, key: &[u8], f: impl FnOnce(Option<&Value>) -> T) -> T {
        // Fast path: shared lock
        {
            let entries = self.read();
            match entries.get(key) {
                None => return f(None),
                Some(entry) if !entry.is_expired() => return f(Some(&entry.value)),
                Some(_) => {}
            }
        }

        // Expired: evict under the exclusive lock, then answer from what is left
        let mut entries = self.write();
        let value = live_entry(&mut entries, key).map(|entry| &entry.value);
        f(value)
    }

    /// Runs `f` against the live list at `key`, deleting the key if the list
    /// ends up empty. Returns `Ok(None)` when the key does not exist.
    fn update_list<T>(
        &self,
        key: &[u8],
        f: impl FnOnce(&mut VecDeque<Bytes>) -> T,
    ) -> StoreResult<Option<T>> {
        let mut entries = self.write();
        let Some(entry) = live_entry(&mut entries, key) else {
            return Ok(None);
        };
        let Value::List(list) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };

        let result = f(list);
        if entry.value.is_drained() {
            entries.remove(key);
        }
        Ok(Some(result))
    }

    /// Hash counterpart of [`Keyspace::update_list`].
    fn update_hash<T>(
        &self,
        key: &[u8],
        f: impl FnOnce(&mut HashMap<Bytes, Bytes>) -> T,
    ) -> StoreResult<Option<T>> {
        let mut entries = self.write();
        let Some(entry) = live_entry(&mut entries, key) else {
            return Ok(None);
        };
        let Value::Hash(hash) = &mut entry.value else {
            return Err(StoreError::WrongType);
        };

        let result = f(hash);
        if entry.value.is_drained() {
            entries.remove(key);
        }
        Ok(Some(result))
    }

    /// Gets or creates the value at `key`, which must be of the kind produced
    /// by `empty`.
    fn upsert<T>(
        &self,
        key: Bytes,
        empty: fn() -> Value,
        f: impl FnOnce(&mut Value) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut entries = self.write();
        live_entry(&mut entries, &key);
        let entry = entries.entry(key).or_insert_with(|| Entry::new(empty()));
        f(&mut entry.value)
    }

    // ========================================================================
    // Keys and strings
    // ========================================================================

    /// Gets the string stored at `key`.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        self.view(key, |value| match value {
            None => Ok(None),
            Some(Value::String(data)) => Ok(Some(data.clone())),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    /// Stores a string, replacing any previous value and clearing its TTL.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.write().insert(key, Entry::new(Value::String(value)));
    }

    /// Removes the given keys, returning how many live keys were removed.
    pub fn delete(&self, keys: &[Bytes]) -> usize {
        let mut entries = self.write();
        let now = Instant::now();

        keys.iter()
            .filter(|key| {
                entries
                    .remove(&key[..])
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .count()
    }

    /// Counts how many of `keys` exist. Repeated keys count once per occurrence.
    pub fn exists(&self, keys: &[Bytes]) -> usize {
        let now = Instant::now();
        let mut found_expired = false;

        let count = {
            let entries = self.read();
            keys.iter()
                .filter(|key| match entries.get(&key[..]) {
                    Some(entry) if entry.is_expired_at(now) => {
                        found_expired = true;
                        false
                    }
                    Some(_) => true,
                    None => false,
                })
                .count()
        };

        if found_expired {
            let mut entries = self.write();
            for key in keys {
                live_entry(&mut entries, key);
            }
        }

        count
    }

    /// Sets a time-to-live in seconds on `key`. Returns `false` if the key
    /// does not exist.
    ///
    /// A TTL of zero or less expires the key immediately.
    pub fn expire(&self, key: &[u8], seconds: i64) -> bool {
        let mut entries = self.write();
        let Some(entry) = live_entry(&mut entries, key) else {
            return false;
        };

        let now = Instant::now();
        entry.expires_at = if seconds <= 0 {
            Some(now)
        } else {
            // Far-future deadlines that overflow `Instant` never expire
            now.checked_add(Duration::from_secs(seconds as u64))
        };
        true
    }

    /// Returns every live key matching the regular expression `pattern`.
    ///
    /// The match is unanchored: `user` matches `superuser`. Use `^` and `$`
    /// to anchor. Order is unspecified.
    pub fn keys(&self, pattern: &[u8]) -> StoreResult<Vec<Bytes>> {
        let pattern = std::str::from_utf8(pattern)
            .map_err(|_| StoreError::InvalidPattern("pattern is not valid UTF-8".to_string()))?;
        let regex = Regex::new(pattern).map_err(|e| StoreError::InvalidPattern(e.to_string()))?;

        let now = Instant::now();
        let mut found_expired = false;

        let matched: Vec<Bytes> = {
            let entries = self.read();
            entries
                .iter()
                .filter(|(_, entry)| {
                    let expired = entry.is_expired_at(now);
                    found_expired |= expired;
                    !expired
                })
                .filter(|(key, _)| regex.is_match(key))
                .map(|(key, _)| key.clone())
                .collect()
        };

        if found_expired {
            self.write().retain(|_, entry| !entry.is_expired_at(now));
        }

        Ok(matched)
    }

    /// Number of entries currently held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// Pushes values onto the head of the list, one at a time, so the last
    /// value ends up first. Returns the new length.
    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> StoreResult<usize> {
        self.push(key, values, VecDeque::push_front)
    }

    /// Appends values to the tail of the list. Returns the new length.
    pub fn rpush(&self, key: Bytes, values: Vec<Bytes>) -> StoreResult<usize> {
        self.push(key, values, VecDeque::push_back)
    }

    fn push(
        &self,
        key: Bytes,
        values: Vec<Bytes>,
        push: fn(&mut VecDeque<Bytes>, Bytes),
    ) -> StoreResult<usize> {
        if values.is_empty() {
            return self.llen(&key);
        }

        self.upsert(key, || Value::List(VecDeque::new()), |value| match value {
            Value::List(list) => {
                for v in values {
                    push(list, v);
                }
                Ok(list.len())
            }
            _ => Err(StoreError::WrongType),
        })
    }

    /// Removes and returns the first element of the list.
    pub fn lpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self.update_list(key, VecDeque::pop_front)?.flatten())
    }

    /// Removes and returns the last element of the list.
    pub fn rpop(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        Ok(self.update_list(key, VecDeque::pop_back)?.flatten())
    }

    /// Length of the list at `key`, 0 if absent.
    pub fn llen(&self, key: &[u8]) -> StoreResult<usize> {
        self.view(key, |value| match value {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    /// Inserts `value` before or after the first occurrence of `pivot`,
    /// searching from the head.
    ///
    /// Returns the new length, `-1` when the pivot is missing, or `0` when
    /// the key does not exist.
    pub fn linsert(
        &self,
        key: &[u8],
        position: InsertPosition,
        pivot: &[u8],
        value: Bytes,
    ) -> StoreResult<i64> {
        let inserted = self.update_list(key, |list| {
            let Some(at) = list.iter().position(|item| &item[..] == pivot) else {
                return -1;
            };
            let at = match position {
                InsertPosition::Before => at,
                InsertPosition::After => at + 1,
            };
            list.insert(at, value);
            list.len() as i64
        })?;

        Ok(inserted.unwrap_or(0))
    }

    /// Element at `index`; negative indices count from the tail.
    pub fn lindex(&self, key: &[u8], index: i64) -> StoreResult<Option<Bytes>> {
        self.view(key, |value| match value {
            None => Ok(None),
            Some(Value::List(list)) => {
                let at = normalize_start(index, list.len());
                Ok(list.get(at).cloned())
            }
            Some(_) => Err(StoreError::WrongType),
        })
    }

    /// Elements from `start` to `stop`, both inclusive, with negative
    /// indices counting from the tail.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        self.view(key, |value| match value {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list_range(list.len(), start, stop)
                .map(|range| list.range(range).cloned().collect())
                .unwrap_or_default()),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    // ========================================================================
    // Hashes
    // ========================================================================

    /// Sets `field` in the hash at `key`. Returns `true` if the field is new.
    pub fn hset(&self, key: Bytes, field: Bytes, value: Bytes) -> StoreResult<bool> {
        self.upsert(key, || Value::Hash(HashMap::new()), |stored| match stored {
            Value::Hash(hash) => Ok(hash.insert(field, value).is_none()),
            _ => Err(StoreError::WrongType),
        })
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> StoreResult<Option<Bytes>> {
        self.view(key, |value| match value {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    /// Removes fields from the hash, returning how many existed.
    pub fn hdel(&self, key: &[u8], fields: &[Bytes]) -> StoreResult<usize> {
        let removed = self.update_hash(key, |hash| {
            fields
                .iter()
                .filter(|field| hash.remove(&field[..]).is_some())
                .count()
        })?;
        Ok(removed.unwrap_or(0))
    }

    /// Number of fields in the hash at `key`.
    pub fn hlen(&self, key: &[u8]) -> StoreResult<usize> {
        self.view(key, |value| match value {
            None => Ok(0),
            Some(Value::Hash(hash)) => Ok(hash.len()),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> StoreResult<bool> {
        self.view(key, |value| match value {
            None => Ok(false),
            Some(Value::Hash(hash)) => Ok(hash.contains_key(field)),
            Some(_) => Err(StoreError::WrongType),
        })
    }
}

/// Evicts `key` if it has expired and returns the entry if it is still live.
/// Must be called with the exclusive lock held.
fn live_entry<'a>(entries: &'a mut Entries, key: &[u8]) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(Entry::is_expired) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

/// Resolves a possibly negative start index against `len`, clamped at 0.
fn normalize_start(index: i64, len: usize) -> usize {
    if index < 0 {
        (len as i64).saturating_add(index).max(0) as usize
    } else {
        index as usize
    }
}

/// Resolves an inclusive `start..=stop` pair into a half-open range, or
/// `None` when it selects nothing.
fn list_range(len: usize, start: i64, stop: i64) -> Option<Range<usize>> {
    let start = normalize_start(start, len);
    let stop = if stop < 0 {
        (len as i64).saturating_add(stop).saturating_add(1).max(0) as usize
    } else {
        (stop as usize).saturating_add(1)
    }
    .min(len);

    (start < stop).then_some(start..stop)
}
