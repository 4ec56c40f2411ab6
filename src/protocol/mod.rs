//! Protocol Module
//!
//! Defines the wire protocol between clients and the log server.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: APPEND - Payload: record bytes
//! - 0x02: READ   - Payload: offset (8)
//! - 0x03: PING   - Payload: empty
//! - 0x04: BOUNDS - Payload: empty
//! - 0x05: READ_FROM - Payload: offset (8) + limit (4), answered by a stream
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK           (APPEND: offset (8), READ: record, BOUNDS: lowest (8) [+ highest (8)])
//! - 0x01: OUT_OF_RANGE
//! - 0x02: ERROR        (payload: message)
//! - 0x03: END_OF_STREAM (payload: next offset (8), closes a READ_FROM stream)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
