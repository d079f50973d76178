//! Codec module - serialization/deserialization for message payloads.
//!
//! The engine speaks a pre-generated tagged-union encoding. This crate
//! stands in for it with [`MsgPackCodec`], which serializes the
//! [`Inbound`](crate::message::Inbound) and [`Outbound`](crate::message::Outbound)
//! unions with `rmp-serde`.
//!
//! # Example
//!
//! ```
//! use cozmo_link::codec::MsgPackCodec;
//! use cozmo_link::message::{Inbound, Ping};
//!
//! let ping = Inbound::from(Ping { counter: 7, time_sent_ms: 1000.0, is_response: false });
//! let encoded = MsgPackCodec::encode(&ping).unwrap();
//! let (decoded, consumed): (Inbound, usize) = MsgPackCodec::decode_counted(&encoded).unwrap();
//! assert_eq!(decoded, ping);
//! assert_eq!(consumed, encoded.len());
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
