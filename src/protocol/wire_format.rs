//! Wire format encoding and decoding.
//!
//! Every message travels as a length-prefixed frame:
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ Length N     │ Payload                     │
//! │ 2 bytes      │ N bytes                     │
//! │ uint16 LE    │ codec-encoded tagged message│
//! └──────────────┴─────────────────────────────┘
//! ```

use crate::error::{LinkError, Result};

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Maximum payload a single frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Size of a single socket read in the read loop.
///
/// Independent of [`MAX_PAYLOAD_SIZE`]: large frames span several reads.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Encode a payload length as a little-endian prefix.
///
/// # Errors
///
/// Returns [`LinkError::PayloadTooLarge`] if `len` does not fit in a u16.
///
/// # Example
///
/// ```
/// use cozmo_link::protocol::encode_length_prefix;
///
/// assert_eq!(encode_length_prefix(0x0102).unwrap(), [0x02, 0x01]);
/// assert!(encode_length_prefix(70_000).is_err());
/// ```
pub fn encode_length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE]> {
    let len = u16::try_from(len).map_err(|_| LinkError::PayloadTooLarge(len))?;
    Ok(len.to_le_bytes())
}

/// Read the length prefix at the start of `buf`.
///
/// Returns `None` if fewer than [`LENGTH_PREFIX_SIZE`] bytes are available.
#[inline]
pub fn decode_length_prefix(buf: &[u8]) -> Option<u16> {
    match buf {
        [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}
