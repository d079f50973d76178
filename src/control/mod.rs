//! Control plane module - session handshake.
//!
//! The engine speaks first. After the socket opens it sends
//! [`UiDeviceConnected`](crate::message::UiDeviceConnected) carrying the
//! fingerprints of the message catalogs it was built with.
//!
//! # Workflow
//!
//! 1. Client opens the socket (`Connecting` -> `AwaitingPeerIdentity`)
//! 2. Engine sends its identity (`Validating`)
//! 3. Client compares fingerprints, engine-to-controller first
//! 4. Client replies with success and becomes `Ready`, or replies with
//!    wrong-version and closes

mod handshake;
mod session;

pub use handshake::{
    success_reply, validate, wrong_version_reply, ClientInfo, FingerprintDirection, Fingerprints,
    VersionMismatch,
};
pub use session::{Session, SessionState};
