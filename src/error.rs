//! Error types for cozmo-link.

use thiserror::Error;

use crate::control::VersionMismatch;
use crate::handler::SubscriberId;
use crate::message::InboundKind;

/// Main error type for all link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Frame length prefix disagrees with the bytes the codec consumed.
    ///
    /// The stream position can no longer be trusted after this.
    #[error("Could not parse message: message size {consumed} not equal to frame size {declared}")]
    Framing {
        /// Length declared by the frame prefix.
        declared: usize,
        /// Bytes actually consumed by the decoder.
        consumed: usize,
    },

    /// Encoded message does not fit in a u16 length prefix.
    #[error("Payload size {0} exceeds maximum {max}", max = crate::protocol::MAX_PAYLOAD_SIZE)]
    PayloadTooLarge(usize),

    /// Engine and client were built against different message catalogs.
    #[error(transparent)]
    ProtocolVersionMismatch(#[from] VersionMismatch),

    /// The subscriber already has a callback for this message type.
    #[error("Subscriber {subscriber} already registered a callback for {kind:?}")]
    DuplicateRegistration {
        /// Message type of the registration.
        kind: InboundKind,
        /// Subscriber that tried to register twice.
        subscriber: SubscriberId,
    },

    /// No callback is registered for this (type, subscriber) pair.
    #[error("Subscriber {subscriber} has no callback registered for {kind:?}")]
    NotRegistered {
        /// Message type of the registration.
        kind: InboundKind,
        /// Subscriber that was looked up.
        subscriber: SubscriberId,
    },

    /// Attempt to send while the connection is not open.
    #[error("Attempt to send message while not connected - {tag}")]
    SendWhileClosed {
        /// Tag of the dropped message.
        tag: &'static str,
    },

    /// Connection closed before the session became ready.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;
