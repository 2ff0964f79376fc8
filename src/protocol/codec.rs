//! Framed codec turning a byte stream into [`Command`]s and [`RespValue`]
//! replies back into bytes.

use crate::connection::ConnectionError;
use crate::protocol::{Command, RespParser, RespValue};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{info, trace};

/// RESP request decoder and reply encoder.
///
/// With `trace` enabled every decoded request and encoded reply is logged,
/// which is what `--trace-protocol` turns on.
#[derive(Debug, Default)]
pub struct RespCodec {
    parser: RespParser,
    trace: bool,
}

impl RespCodec {
    pub fn new(trace: bool) -> Self {
        Self {
            parser: RespParser::new(),
            trace,
        }
    }
}

impl Decoder for RespCodec {
    type Item = Command;
    type Error = ConnectionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>, ConnectionError> {
        let Some((value, consumed)) = self.parser.parse(src)? else {
            trace!(buffered = src.len(), "Incomplete frame, need more data");
            return Ok(None);
        };
        src.advance(consumed);

        if self.trace {
            info!(target: "multikv::protocol", direction = "read", frame = %value);
        }

        match Command::from_resp(value) {
            Some(command) => Ok(Some(command)),
            None => Err(ConnectionError::InvalidRequest),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Command>, ConnectionError> {
        match self.decode(src)? {
            Some(command) => Ok(Some(command)),
            None if src.is_empty() => Ok(None),
            None => Err(ConnectionError::UnexpectedEof),
        }
    }
}

impl Encoder<RespValue> for RespCodec {
    type Error = ConnectionError;

    fn encode(&mut self, item: RespValue, dst: &mut BytesMut) -> Result<(), ConnectionError> {
        if self.trace {
            info!(target: "multikv::protocol", direction = "write", frame = %item);
        }
        item.serialize_into(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_decode_pipelined_commands() {
        let mut codec = RespCodec::default();
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$1\r\na\r\nPING\r\n*1\r\n$3\r\nDE"[..]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, Command::new("get", vec![Bytes::from("a")]));

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second, Command::new("ping", vec![]));

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"*1\r\n$3\r\nDE");
    }

    #[test]
    fn test_decode_rejects_non_array_request() {
        let mut codec = RespCodec::default();
        let mut buf = BytesMut::from(&b":1\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ConnectionError::InvalidRequest)
        ));
    }

    #[test]
    fn test_decode_malformed_frame() {
        let mut codec = RespCodec::new(true);
        let mut buf = BytesMut::from(&b"*1\r\n$x\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ConnectionError::Parse(_))
        ));
    }

    #[test]
    fn test_decode_eof_with_partial_frame() {
        let mut codec = RespCodec::default();
        let mut buf = BytesMut::from(&b"*1\r\n$4\r\nPI"[..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(ConnectionError::UnexpectedEof)
        ));

        let mut empty = BytesMut::new();
        assert!(codec.decode_eof(&mut empty).unwrap().is_none());
    }

    #[test]
    fn test_encode_reply() {
        let mut codec = RespCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(RespValue::ok(), &mut buf).unwrap();
        codec.encode(RespValue::null(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"+OK\r\n$-1\r\n");
    }
}
