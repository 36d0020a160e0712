//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET:    key_len (4 bytes) + key
//! - PUT:    key_len (4 bytes) + key + value
//! - DELETE: key_len (4 bytes) + key
//! - PING:   empty
//!
//! Keys and values must be UTF-8.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{DuraError, Result};
use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = BytesMut::new();
    match command {
        Command::Get { key } | Command::Delete { key } => put_key(&mut payload, key),
        Command::Put { key, value } => {
            put_key(&mut payload, key);
            payload.put_slice(value.as_bytes());
        }
        Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (type_byte, mut payload) = split_frame(bytes, "command")?;

    let cmd_type = CommandType::from_byte(type_byte).ok_or_else(|| {
        DuraError::Protocol(format!("Unknown command type: 0x{:02x}", type_byte))
    })?;

    match cmd_type {
        CommandType::Get => Ok(Command::Get {
            key: take_key(&mut payload, "GET")?,
        }),
        CommandType::Put => {
            let key = take_key(&mut payload, "PUT")?;
            let value = utf8(payload.to_vec(), "PUT value")?;
            Ok(Command::Put { key, value })
        }
        CommandType::Delete => Ok(Command::Delete {
            key: take_key(&mut payload, "DELETE")?,
        }),
        CommandType::Ping => {
            if !payload.is_empty() {
                return Err(DuraError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Command::Ping)
        }
    }
}

fn put_key(buf: &mut BytesMut, key: &str) {
    buf.put_u32(key.len() as u32);
    buf.put_slice(key.as_bytes());
}

/// Read `key_len + key` off the front of `payload`
fn take_key(payload: &mut &[u8], name: &str) -> Result<String> {
    if payload.remaining() < 4 {
        return Err(DuraError::Protocol(format!(
            "{} command: missing key length",
            name
        )));
    }

    let key_len = payload.get_u32() as usize;
    if payload.remaining() < key_len {
        return Err(DuraError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            name,
            key_len,
            payload.remaining()
        )));
    }

    let key = payload[..key_len].to_vec();
    payload.advance(key_len);
    utf8(key, &format!("{} key", name))
}

fn utf8(bytes: Vec<u8>, what: &str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| DuraError::Protocol(format!("{} is not valid UTF-8", what)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::from_byte(status_byte).ok_or_else(|| {
        DuraError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing
// =============================================================================

fn frame(type_byte: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(type_byte);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

fn check_payload_len(len: usize, what: &str) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(DuraError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

/// Validate a frame and return its type byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(DuraError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let type_byte = header.get_u8();
    let payload_len = header.get_u32() as usize;
    check_payload_len(payload_len, what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(DuraError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((type_byte, &bytes[HEADER_SIZE..total_len]))
}

/// Read one frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    check_payload_len(payload_len, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader, "command")?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader, "response")?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
