//! Frame struct and frame builders.
//!
//! A [`Frame`] is one length-prefixed unit pulled off the byte stream.
//! Decoding a frame checks that the codec consumed exactly the declared
//! number of bytes; any disagreement means the stream is misaligned.
//!
//! # Example
//!
//! ```
//! use cozmo_link::message::{Inbound, Ping};
//! use cozmo_link::protocol::{encode_frame, FrameBuffer};
//!
//! let ping = Inbound::from(Ping { counter: 1, time_sent_ms: 0.0, is_response: false });
//! let bytes = encode_frame(&ping).unwrap();
//!
//! let mut buffer = FrameBuffer::new();
//! let frames = buffer.push(&bytes);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].decode::<Inbound>().unwrap(), ping);
//! ```

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::wire_format::{encode_length_prefix, LENGTH_PREFIX_SIZE};
use crate::codec::MsgPackCodec;
use crate::error::{LinkError, Result};

/// A complete frame taken from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from a payload.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Length declared by the frame's prefix.
    #[inline]
    pub fn declared_len(&self) -> usize {
        self.payload.len()
    }

    /// Decode the payload into a message.
    ///
    /// # Errors
    ///
    /// - Codec errors if the payload is not a valid message
    /// - [`LinkError::Framing`] if the message is shorter than the frame
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let (value, consumed) = MsgPackCodec::decode_counted(&self.payload)?;
        if consumed != self.declared_len() {
            return Err(LinkError::Framing {
                declared: self.declared_len(),
                consumed,
            });
        }
        Ok(value)
    }
}

/// Prefix a payload with its length.
///
/// # Errors
///
/// Returns [`LinkError::PayloadTooLarge`] if the payload exceeds 65535 bytes.
pub fn build_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let prefix = encode_length_prefix(payload.len())?;
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encode a message and frame it in one step.
///
/// # Errors
///
/// Returns codec errors or [`LinkError::PayloadTooLarge`].
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let payload = MsgPackCodec::encode(message)?;
    build_frame(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Inbound, Ping};
    use crate::protocol::MAX_PAYLOAD_SIZE;

    fn ping(counter: u32) -> Inbound {
        Inbound::from(Ping {
            counter,
            time_sent_ms: 12.5,
            is_response: false,
        })
    }

    #[test]
    fn test_build_frame_layout() {
        let bytes = build_frame(b"hello").unwrap();
        assert_eq!(&bytes[..2], &[5, 0]);
        assert_eq!(&bytes[2..], b"hello");
    }

    #[test]
    fn test_build_frame_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            build_frame(&payload),
            Err(LinkError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_decode_exact_frame() {
        let bytes = encode_frame(&ping(9)).unwrap();
        let frame = Frame::new(Bytes::copy_from_slice(&bytes[LENGTH_PREFIX_SIZE..]));

        assert_eq!(frame.decode::<Inbound>().unwrap(), ping(9));
    }

    #[test]
    fn test_decode_detects_length_mismatch() {
        let mut payload = MsgPackCodec::encode(&ping(9)).unwrap();
        let message_len = payload.len();
        payload.push(0xC0);
        let frame = Frame::new(Bytes::from(payload));

        match frame.decode::<Inbound>() {
            Err(LinkError::Framing { declared, consumed }) => {
                assert_eq!(declared, message_len + 1);
                assert_eq!(consumed, message_len);
            }
            other => panic!("expected framing error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_truncated_payload_fails() {
        let payload = MsgPackCodec::encode(&ping(9)).unwrap();
        let frame = Frame::new(Bytes::copy_from_slice(&payload[..payload.len() - 1]));

        assert!(frame.decode::<Inbound>().is_err());
    }
}
