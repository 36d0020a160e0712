//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
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
//! - 0x01: GET   - Payload: key_len (4) + key
//! - 0x02: PUT   - Payload: key_len (4) + key + value
//! - 0x03: DEL   - Payload: key_len (4) + key
//! - 0x04: PING  - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK         (HTTP 200)
//! - 0x01: NOT_FOUND  (HTTP 404)
//! - 0x02: ERROR      (HTTP 500)
//! - 0x03: CREATED    (HTTP 201)
//! - 0x04: TOO_LARGE  (HTTP 413)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    encode_command, decode_command, encode_response, decode_response,
    read_command, write_command, read_response, write_response,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
