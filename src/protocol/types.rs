//! RESP Data Types
//!
//! Values exchanged with clients. Requests arrive as arrays of bulk strings,
//! replies leave as one of the shapes below.
//!
//! ## Wire Format
//!
//! | Prefix | Type          | Example                 |
//! |--------|---------------|-------------------------|
//! | `+`    | Simple String | `+OK\r\n`               |
//! | `-`    | Error         | `-ERR syntax error\r\n` |
//! | `:`    | Integer       | `:3\r\n`                |
//! | `$`    | Bulk String   | `$5\r\nhello\r\n`       |
//! | `$-1`  | Nil Bulk      | `$-1\r\n`               |
//! | `*`    | Array         | `*1\r\n$1\r\na\r\n`     |

use bytes::{BufMut, Bytes};
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A value in the RESP protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply, e.g. `+OK`. Must not contain CRLF.
    SimpleString(String),

    /// Error reply, e.g. `-WRONGTYPE ...`.
    Error(String),

    /// 64-bit signed integer.
    Integer(i64),

    /// Binary-safe string.
    BulkString(Bytes),

    /// Nil bulk string (`$-1`). Null arrays are decoded to this as well.
    Null,

    /// Array of values, possibly nested.
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates an error reply.
    ///
    /// # Example
    /// ```
    /// use multikv::protocol::RespValue;
    /// let err = RespValue::error("ERR syntax error");
    /// assert_eq!(err.serialize(), b"-ERR syntax error\r\n");
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Builds an array reply of bulk strings.
    pub fn bulk_array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        RespValue::Array(items.into_iter().map(RespValue::bulk_string).collect())
    }

    /// Bulk string when present, nil bulk otherwise.
    pub fn optional_bulk(data: Option<Bytes>) -> Self {
        data.map_or(RespValue::Null, RespValue::BulkString)
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value to its wire representation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into any byte sink (`Vec<u8>`, `BytesMut`, ...).
    pub fn serialize_into<B: BufMut>(&self, buf: &mut B) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

#[inline]
fn write_line<B: BufMut>(buf: &mut B, prefix: u8, content: &[u8]) {
    buf.put_u8(prefix);
    buf.put_slice(content);
    buf.put_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_status_and_error_serialize() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
        assert_eq!(
            RespValue::error("NOAUTH Authentication required.").serialize(),
            b"-NOAUTH Authentication required.\r\n"
        );
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(RespValue::integer(5).serialize(), b":5\r\n");
        assert_eq!(RespValue::integer(-1).serialize(), b":-1\r\n");
    }

    #[test]
    fn test_bulk_and_nil_serialize() {
        assert_eq!(RespValue::bulk_string("1").serialize(), b"$1\r\n1\r\n");
        assert_eq!(RespValue::bulk_string("").serialize(), b"$0\r\n\r\n");
        assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
        assert_eq!(RespValue::optional_bulk(None), RespValue::Null);
    }

    #[test]
    fn test_bulk_array_serialize() {
        let value = RespValue::bulk_array(vec![Bytes::from("z"), Bytes::from("y")]);
        assert_eq!(value.serialize(), b"*2\r\n$1\r\nz\r\n$1\r\ny\r\n");
        assert_eq!(RespValue::bulk_array(Vec::<Bytes>::new()).serialize(), b"*0\r\n");
    }

    #[test]
    fn test_serialize_into_bytes_mut() {
        let mut buf = BytesMut::new();
        RespValue::ok().serialize_into(&mut buf);
        RespValue::integer(1).serialize_into(&mut buf);
        assert_eq!(&buf[..], b"+OK\r\n:1\r\n");
    }

    #[test]
    fn test_display() {
        assert_eq!(RespValue::null().to_string(), "(nil)");
        assert_eq!(
            RespValue::bulk_array(vec![Bytes::from("a"), Bytes::from("b")]).to_string(),
            "[\"a\", \"b\"]"
        );
    }
}
