//! Incremental RESP Parser
//!
//! The parser works on whatever bytes have arrived so far and returns:
//! - `Ok(Some((value, consumed)))` when a complete value is buffered
//! - `Ok(None)` when more bytes are needed
//! - `Err(ParseError)` when the bytes can never form a valid value
//!
//! Besides the typed RESP frames, lines without a type prefix are accepted as
//! inline commands (`PING\r\n`, `SET a 1\r\n`) so the server can be driven
//! from telnet or netcat.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that make the buffered bytes unparseable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum length of an inline command line or a type header line
pub const MAX_LINE_SIZE: usize = 64 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// A stateless-between-calls RESP parser.
#[derive(Debug, Default)]
pub struct RespParser {
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to parse one value from the front of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        match first {
            prefix::SIMPLE_STRING => Ok(read_text(buf, "simple string")?
                .map(|(s, used)| (RespValue::SimpleString(s), used))),
            prefix::ERROR => {
                Ok(read_text(buf, "error")?.map(|(s, used)| (RespValue::Error(s), used)))
            }
            prefix::INTEGER => {
                Ok(read_number(buf)?.map(|(n, used)| (RespValue::Integer(n), used)))
            }
            prefix::BULK_STRING => parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            _ => parse_inline(buf),
        }
    }

    /// `*<count>\r\n<element>...`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some((count, mut consumed)) = read_number(buf)? else {
            return Ok(None);
        };

        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        self.depth += 1;
        // Cap the preallocation; the count is client-controlled.
        let mut elements = Vec::with_capacity((count as usize).min(1024));
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => {
                    self.depth -= 1;
                    return Ok(None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// `$<length>\r\n<data>\r\n`
fn parse_bulk_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((length, header)) = read_number(buf)? else {
        return Ok(None);
    };

    if length == -1 {
        return Ok(Some((RespValue::Null, header)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total = header + length + CRLF.len();
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + length..total] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[header..header + length]);
    Ok(Some((RespValue::BulkString(data), total)))
}

/// A whitespace-separated command line without a type prefix.
fn parse_inline(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((line, consumed)) = read_line(buf, 0)? else {
        return Ok(None);
    };

    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8("inline command"))?;
    let elements: Vec<RespValue> = line
        .split_whitespace()
        .map(|part| RespValue::BulkString(Bytes::copy_from_slice(part.as_bytes())))
        .collect();

    if elements.is_empty() {
        return Err(ParseError::ProtocolError("empty inline command".to_string()));
    }

    Ok(Some((RespValue::Array(elements), consumed)))
}

/// Reads the line after the one-byte type prefix as UTF-8 text.
fn read_text(buf: &[u8], what: &'static str) -> ParseResult<Option<(String, usize)>> {
    let Some((line, consumed)) = read_line(buf, 1)? else {
        return Ok(None);
    };
    let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8(what))?;
    Ok(Some((text.to_string(), consumed)))
}

/// Reads the line after the one-byte type prefix as a signed integer.
fn read_number(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let Some((line, consumed)) = read_line(buf, 1)? else {
        return Ok(None);
    };
    let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8("integer"))?;
    let n = text
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidInteger(text.to_string()))?;
    Ok(Some((n, consumed)))
}

/// Returns the bytes between `start` and the first CRLF, plus the number of
/// bytes consumed including the CRLF.
fn read_line(buf: &[u8], start: usize) -> ParseResult<Option<(&[u8], usize)>> {
    match find_crlf(&buf[start..]) {
        Some(pos) => Ok(Some((&buf[start..start + pos], start + pos + CRLF.len()))),
        None if buf.len() > MAX_LINE_SIZE => Err(ParseError::MessageTooLarge {
            size: buf.len(),
            max: MAX_LINE_SIZE,
        }),
        None => Ok(None),
    }
}

#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single RESP message with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
