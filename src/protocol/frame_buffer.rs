//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Socket reads
//! land at arbitrary byte boundaries: a read may hold half a length
//! prefix, several whole frames, or the tail of one frame and the head of
//! the next. The buffer only hands out a frame once all `2 + N` bytes are
//! present, and never consumes anything otherwise.
//!
//! # Example
//!
//! ```
//! use cozmo_link::protocol::{build_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = build_frame(b"abc").unwrap();
//!
//! buffer.append(&bytes[..3]);
//! assert!(buffer.try_extract_frame().is_none());
//!
//! buffer.append(&bytes[3..]);
//! let frame = buffer.try_extract_frame().unwrap();
//! assert_eq!(frame.payload(), b"abc");
//! ```

use bytes::BytesMut;

use super::wire_format::{decode_length_prefix, LENGTH_PREFIX_SIZE, READ_CHUNK_SIZE};
use super::Frame;

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
}

impl FrameBuffer {
    /// Create a new frame buffer sized for a couple of socket reads.
    pub fn new() -> Self {
        Self::with_capacity(2 * READ_CHUNK_SIZE)
    }

    /// Create a new frame buffer with a custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Append data to the buffer without extracting frames.
    ///
    /// Call [`try_extract_frame`](Self::try_extract_frame) until it returns
    /// `None` afterwards; one read can carry several frames.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single frame from the head of the buffer.
    ///
    /// Returns `None` without consuming anything if the length prefix or
    /// the payload is still incomplete.
    pub fn try_extract_frame(&mut self) -> Option<Frame> {
        let payload_len = usize::from(decode_length_prefix(&self.buffer)?);
        let packet_len = LENGTH_PREFIX_SIZE + payload_len;

        if self.buffer.len() < packet_len {
            return None;
        }

        let mut packet = self.buffer.split_to(packet_len);
        let payload = packet.split_off(LENGTH_PREFIX_SIZE).freeze();
        Some(Frame::new(payload))
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data stays buffered for the next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.append(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;

    fn make_frame_bytes(payload: &[u8]) -> Vec<u8> {
        build_frame(payload).unwrap()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();

        let frames = buffer.push(&make_frame_bytes(b"hello"));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"hello");
        assert_eq!(frames[0].declared_len(), 5);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = make_frame_bytes(b"first");
        combined.extend(make_frame_bytes(b"second"));
        combined.extend(make_frame_bytes(b"third"));

        let frames = buffer.push(&combined);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload(), b"first");
        assert_eq!(frames[1].payload(), b"second");
        assert_eq!(frames[2].payload(), b"third");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_prefix_consumes_nothing() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes(b"test");

        buffer.append(&frame_bytes[..1]);
        assert!(buffer.try_extract_frame().is_none());
        assert_eq!(buffer.len(), 1);

        buffer.append(&frame_bytes[1..]);
        let frame = buffer.try_extract_frame().unwrap();
        assert_eq!(frame.payload(), b"test");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_payload_consumes_nothing() {
        let mut buffer = FrameBuffer::new();
        let payload = b"this is a longer payload that will be fragmented";
        let frame_bytes = make_frame_bytes(payload);

        let partial_len = LENGTH_PREFIX_SIZE + 10;
        assert!(buffer.push(&frame_bytes[..partial_len]).is_empty());
        assert_eq!(buffer.len(), partial_len);

        let frames = buffer.push(&frame_bytes[partial_len..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), payload);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let mut buffer = FrameBuffer::new();

        let frames = buffer.push(&make_frame_bytes(b""));

        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload().is_empty());
    }

    #[test]
    fn test_max_size_payload_across_reads() {
        let mut buffer = FrameBuffer::new();
        let payload = vec![0xAB; u16::MAX as usize];
        let frame_bytes = make_frame_bytes(&payload);

        let mut frames = Vec::new();
        for chunk in frame_bytes.chunks(READ_CHUNK_SIZE) {
            frames.extend(buffer.push(chunk));
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].declared_len(), u16::MAX as usize);
        assert!(frames[0].payload().iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut buffer = FrameBuffer::new();

        let frame1 = make_frame_bytes(b"first");
        let frame2 = make_frame_bytes(b"second");

        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..5]);

        let frames = buffer.push(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"first");
        assert_eq!(buffer.len(), 5);

        let frames = buffer.push(&frame2[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), b"second");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = make_frame_bytes(b"hi");

        let mut all_frames = Vec::new();
        for byte in &frame_bytes {
            all_frames.extend(buffer.push(&[*byte]));
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload(), b"hi");
    }

    #[test]
    fn test_clear_drops_partial_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.append(&make_frame_bytes(b"test")[..4]);
        assert!(!buffer.is_empty());

        buffer.clear();

        assert!(buffer.is_empty());
        assert!(buffer.try_extract_frame().is_none());
    }
}
