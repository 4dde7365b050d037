//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Frames share one header layout in both directions:
//! `type/status (1) + payload_len (4, big-endian) + payload`.
//! Command payloads are the bincode encoding of the [`Command`]; the type byte
//! must agree with the decoded variant.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{Command, CommandType, Response, Status};
use crate::error::{DocError, Result};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Result<Bytes> {
    let payload = bincode::serialize(command)?;
    check_payload_len(payload.len(), "Command")?;

    Ok(frame(command.command_type() as u8, &payload))
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "Command")?;

    let expected = CommandType::from_u8(cmd_type).ok_or_else(|| {
        DocError::Protocol(format!("Unknown command type: 0x{:02x}", cmd_type))
    })?;

    let command: Command = bincode::deserialize(payload)
        .map_err(|e| DocError::Protocol(format!("Malformed {:?} payload: {}", expected, e)))?;

    if command.command_type() != expected {
        return Err(DocError::Protocol(format!(
            "Command type mismatch: header says {:?}, payload holds {:?}",
            expected,
            command.command_type()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    check_payload_len(payload.len(), "Response")?;

    Ok(frame(response.status as u8, payload))
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "Response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Duplicate,
        0x03 => Status::Error,
        _ => {
            return Err(DocError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing helpers
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(kind);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.freeze()
}

fn check_payload_len(len: usize, what: &str) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(DocError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn payload_len(header: &[u8]) -> usize {
    u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize
}

/// Validate a complete frame and split it into kind byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(DocError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what.to_lowercase(),
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let len = payload_len(bytes);
    check_payload_len(len, what)?;

    let total_len = HEADER_SIZE + len;
    if bytes.len() < total_len {
        return Err(DocError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what.to_lowercase(),
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Read one full frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let len = payload_len(&header);
    check_payload_len(len, what)?;

    let mut message = vec![0u8; HEADER_SIZE + len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "Command")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "Response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
