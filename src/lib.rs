//! # cozmo-link
//!
//! Client transport and session layer for the Cozmo robot engine.
//!
//! A controller connects to the engine over TCP, completes a version
//! handshake, then exchanges typed messages and queues actions whose
//! completion it can wait on.
//!
//! ## Architecture
//!
//! - **Framing**: `[u16 LE length][MessagePack payload]`, reassembled from
//!   arbitrary socket reads
//! - **Dispatch**: inbound messages fan out to callbacks keyed by message
//!   type and subscriber
//! - **Actions**: queued actions carry a correlation id and resolve when
//!   the engine reports completion
//! - **Session**: the engine's catalog fingerprints must match before the
//!   connection is ready
//!
//! One background thread per connection reads the socket and runs every
//! callback. Sends happen on the calling thread.
//!
//! ## Example
//!
//! ```ignore
//! use cozmo_link::message::{AnimationAvailable, RequestAvailableAnimations};
//! use cozmo_link::{Connection, SubscriberId};
//!
//! let connection = Connection::connect(("127.0.0.1", 5106))?;
//!
//! connection.add_callback(SubscriberId::next(), |anim: &AnimationAvailable| {
//!     println!("{}", anim.anim_name);
//!     Ok(())
//! })?;
//! connection.send_message(RequestAvailableAnimations)?;
//! ```

pub mod action;
pub mod codec;
pub mod control;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod transport;

mod connection;
mod writer;

pub use action::{Action, ActionId, ActionStatus, ActionTracker};
pub use connection::{Connection, ConnectionBuilder, ConnectionConfig, DEFAULT_THREAD_NAME};
pub use control::{ClientInfo, Fingerprints, SessionState};
pub use error::{LinkError, Result};
pub use handler::{CallbackResult, SubscriberId};
pub use transport::{DEFAULT_HOST, DEFAULT_PORT};
pub use writer::FrameWriter;
