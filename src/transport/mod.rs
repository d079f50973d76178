//! Transport module - TCP socket handling.
//!
//! The engine listens on a plain TCP port; one socket carries the whole
//! session. The socket is split into a read half owned by the read loop and
//! a write half owned by the [`FrameWriter`](crate::writer::FrameWriter).

mod tcp;

pub use tcp::{connect, split, DEFAULT_HOST, DEFAULT_PORT};
