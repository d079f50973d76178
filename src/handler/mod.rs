//! Handler module - callback registration and dispatch.
//!
//! Provides:
//! - [`CallbackRegistry`] - maps message tags to subscriber callbacks
//! - [`SubscriberId`] - identity half of a registration key
//!
//! # Example
//!
//! ```
//! use cozmo_link::handler::{CallbackRegistry, SubscriberId};
//! use cozmo_link::message::AnimationAvailable;
//!
//! let registry = CallbackRegistry::new();
//! registry
//!     .register(SubscriberId::next(), |m: &AnimationAvailable| {
//!         println!("{}", m.anim_name);
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

mod registry;

pub use registry::{
    Callback, CallbackError, CallbackRegistry, CallbackResult, SubscriberId, TypedCallback,
};
