//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the stream framing used on the engine socket:
//! - 2-byte little-endian length prefix
//! - Frame buffer for accumulating partial reads
//! - Frame struct with length-checked decoding

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, encode_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    decode_length_prefix, encode_length_prefix, LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE,
    READ_CHUNK_SIZE,
};
