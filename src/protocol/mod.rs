//! RESP Protocol Implementation
//!
//! The wire layer between sockets and the command router.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` enum and its serialization
//! - `parser`: incremental parser for incoming bytes
//! - `command`: `Command`, the decoded request handed to the router
//! - `codec`: `RespCodec`, a `tokio_util` codec tying the above together
//!
//! ## Example
//!
//! ```
//! use multikv::protocol::{parse_message, Command, RespValue};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! let command = Command::from_resp(value).unwrap();
//! assert_eq!(command.name, "get");
//!
//! assert_eq!(RespValue::null().serialize(), b"$-1\r\n");
//! ```

pub mod codec;
pub mod command;
pub mod parser;
pub mod types;

pub use codec::RespCodec;
pub use command::Command;
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
