//! Frame Codec
//!
//! Every message on the wire is prefixed with a 4-byte network-order
//! (big-endian) unsigned length followed by exactly that many bytes of
//! UTF-8 JSON text. The codec is shared by the server connection loop and
//! the client; it performs byte transformation only, no I/O.

use crate::error::{McpError, McpResult};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Encode a payload into a framed message: 4-byte big-endian length
/// followed by the payload bytes.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Decode and validate a length prefix.
///
/// Rejects zero-length frames and frames larger than `max_message_size`
/// before any body bytes are read; an attacker-controlled length must
/// never drive an allocation.
pub fn decode_length(header: [u8; LENGTH_PREFIX_SIZE], max_message_size: usize) -> McpResult<u32> {
    let length = u32::from_be_bytes(header);
    if length == 0 {
        return Err(McpError::InvalidFrameLength(0));
    }
    if length as usize > max_message_size {
        return Err(McpError::MessageTooLarge(length as usize, max_message_size));
    }
    Ok(length)
}
