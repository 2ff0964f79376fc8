//! Keyspace value types.

use crate::storage::StoreError;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// The payload stored under a key. Exactly one shape is live at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
}

impl Value {
    /// True when a container value has no elements left.
    pub fn is_drained(&self) -> bool {
        match self {
            Value::String(_) => false,
            Value::List(list) => list.is_empty(),
            Value::Hash(hash) => hash.is_empty(),
        }
    }
}

/// A stored value with an optional absolute expiry instant.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// An entry is expired once `now` reaches its expiry instant.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// Where `LINSERT` places the new element relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

impl InsertPosition {
    /// Parses `BEFORE` / `AFTER`, case-insensitively.
    pub fn parse(token: &[u8]) -> Result<Self, StoreError> {
        if token.eq_ignore_ascii_case(b"before") {
            Ok(InsertPosition::Before)
        } else if token.eq_ignore_ascii_case(b"after") {
            Ok(InsertPosition::After)
        } else {
            Err(StoreError::Syntax)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_entry_expiry_boundary() {
        let now = Instant::now();
        let mut entry = Entry::new(Value::String(Bytes::from("v")));
        assert!(!entry.is_expired_at(now));

        entry.expires_at = Some(now);
        assert!(entry.is_expired_at(now));

        entry.expires_at = Some(now + Duration::from_secs(1));
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn test_insert_position_parse() {
        assert_eq!(InsertPosition::parse(b"BEFORE").unwrap(), InsertPosition::Before);
        assert_eq!(InsertPosition::parse(b"after").unwrap(), InsertPosition::After);
        assert!(matches!(InsertPosition::parse(b"middle"), Err(StoreError::Syntax)));
    }

    #[test]
    fn test_drained() {
        assert!(!Value::String(Bytes::new()).is_drained());
        assert!(Value::List(VecDeque::new()).is_drained());
        assert!(Value::Hash(HashMap::new()).is_drained());
    }
}
