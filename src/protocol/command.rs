//! Parsed client commands.

use crate::protocol::RespValue;
use bytes::Bytes;
use std::fmt;

/// A decoded request: a lowercased command name plus its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, lowercased (`"get"`, `"lpush"`, ...)
    pub name: String,
    /// Arguments after the name, in wire order
    pub args: Vec<Bytes>,
}

impl Command {
    /// Creates a command, normalizing the name to lowercase.
    pub fn new(name: impl AsRef<str>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.as_ref().to_ascii_lowercase(),
            args,
        }
    }

    /// Converts a decoded RESP value into a command.
    ///
    /// Only non-empty arrays qualify. Elements may be bulk strings, simple
    /// strings or integers; anything else is rejected.
    pub fn from_resp(value: RespValue) -> Option<Self> {
        let RespValue::Array(items) = value else {
            return None;
        };

        let mut parts = items.into_iter().map(|item| match item {
            RespValue::BulkString(b) => Some(b),
            RespValue::SimpleString(s) => Some(Bytes::from(s)),
            RespValue::Integer(n) => Some(Bytes::from(n.to_string())),
            _ => None,
        });

        let name = parts.next()??;
        let args = parts.collect::<Option<Vec<_>>>()?;

        Some(Self {
            name: String::from_utf8_lossy(&name).to_ascii_lowercase(),
            args,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_resp_lowercases_name() {
        let value = RespValue::bulk_array(vec![Bytes::from("LPUSH"), Bytes::from("K"), Bytes::from("V")]);
        let cmd = Command::from_resp(value).unwrap();
        assert_eq!(cmd.name, "lpush");
        assert_eq!(cmd.args, vec![Bytes::from("K"), Bytes::from("V")]);
    }

    #[test]
    fn test_from_resp_accepts_integers() {
        let value = RespValue::array(vec![
            RespValue::bulk_string("select"),
            RespValue::integer(3),
        ]);
        let cmd = Command::from_resp(value).unwrap();
        assert_eq!(cmd.args, vec![Bytes::from("3")]);
    }

    #[test]
    fn test_from_resp_rejects_invalid_requests() {
        assert!(Command::from_resp(RespValue::bulk_string("GET")).is_none());
        assert!(Command::from_resp(RespValue::array(vec![])).is_none());
        assert!(Command::from_resp(RespValue::Null).is_none());
        assert!(Command::from_resp(RespValue::array(vec![
            RespValue::bulk_string("get"),
            RespValue::Null,
        ]))
        .is_none());
    }

    #[test]
    fn test_display() {
        let cmd = Command::new("SET", vec![Bytes::from("a"), Bytes::from("1")]);
        assert_eq!(cmd.to_string(), "set a 1");
    }
}
