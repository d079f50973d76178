//! Compiled-in catalog fingerprints and build versions.
//!
//! The engine sends the fingerprints of the catalog it was built with in
//! [`UiDeviceConnected`](super::UiDeviceConnected); both must equal these
//! for the session to proceed.

/// Fingerprint of the engine-to-controller ([`Inbound`](super::Inbound)) catalog.
pub const ENGINE_TO_GAME_HASH: [u8; 16] = [
    0x5d, 0x2c, 0x8e, 0x91, 0x3a, 0x47, 0xf0, 0x6b, 0xc4, 0x18, 0x7e, 0xd2, 0x09, 0xa5, 0x63, 0x3f,
];

/// Fingerprint of the controller-to-engine ([`Outbound`](super::Outbound)) catalog.
pub const GAME_TO_ENGINE_HASH: [u8; 16] = [
    0xa1, 0x0e, 0x74, 0x2b, 0x96, 0xd8, 0x35, 0x4c, 0xef, 0x81, 0x1a, 0x57, 0xb3, 0x60, 0xcd, 0x28,
];

/// Version of the message catalog.
pub const CLAD_VERSION: &str = "1.0.0";

/// Version of this client module.
pub const INTERFACE_VERSION: &str = env!("CARGO_PKG_VERSION");
