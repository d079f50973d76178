//! Catalog fingerprint validation and handshake replies.
//!
//! The engine opens every session with [`UiDeviceConnected`]. The client
//! compares both catalog fingerprints against its own and answers with
//! either [`UiDeviceConnectionSuccess`] or [`UiDeviceConnectionWrongVersion`].
//!
//! # Example
//!
//! ```
//! use cozmo_link::control::{validate, Fingerprints, FingerprintDirection};
//! use cozmo_link::message::{UiConnectionType, UiDeviceConnected};
//!
//! let fingerprints = Fingerprints::default();
//! let mut identity = UiDeviceConnected {
//!     connection_type: UiConnectionType::SdkOverTcp,
//!     device_id: 1,
//!     robot_id: 1,
//!     success: true,
//!     to_game_hash: fingerprints.engine_to_game.clone(),
//!     to_engine_hash: fingerprints.game_to_engine.clone(),
//!     build_version: "1.0.0".into(),
//! };
//! assert!(validate(&fingerprints, &identity).is_ok());
//!
//! identity.to_game_hash = vec![0; 16];
//! let err = validate(&fingerprints, &identity).unwrap_err();
//! assert_eq!(err.direction, FingerprintDirection::EngineToGame);
//! ```

use std::fmt;

use thiserror::Error;

use crate::message::version::{
    CLAD_VERSION, ENGINE_TO_GAME_HASH, GAME_TO_ENGINE_HASH, INTERFACE_VERSION,
};
use crate::message::{UiDeviceConnected, UiDeviceConnectionSuccess, UiDeviceConnectionWrongVersion};

/// Catalog fingerprints the client expects the engine to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprints {
    /// Fingerprint of the engine-to-controller catalog.
    pub engine_to_game: Vec<u8>,
    /// Fingerprint of the controller-to-engine catalog.
    pub game_to_engine: Vec<u8>,
}

impl Default for Fingerprints {
    fn default() -> Self {
        Self {
            engine_to_game: ENGINE_TO_GAME_HASH.to_vec(),
            game_to_engine: GAME_TO_ENGINE_HASH.to_vec(),
        }
    }
}

/// Client metadata reported to the engine on a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Message catalog version.
    pub build_version: String,
    /// Version of this client module.
    pub sdk_module_version: String,
    /// Host language or runtime version.
    pub platform_version: String,
    /// Client implementation name.
    pub platform_implementation: String,
    /// Host operating system.
    pub os_version: String,
    /// Host CPU architecture.
    pub cpu_version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            build_version: CLAD_VERSION.to_string(),
            sdk_module_version: INTERFACE_VERSION.to_string(),
            platform_version: "Rust".to_string(),
            platform_implementation: env!("CARGO_PKG_NAME").to_string(),
            os_version: std::env::consts::OS.to_string(),
            cpu_version: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Which catalog fingerprint failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintDirection {
    /// Engine-to-controller catalog; checked first.
    EngineToGame,
    /// Controller-to-engine catalog.
    GameToEngine,
}

impl fmt::Display for FingerprintDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineToGame => f.write_str("CladMismatchEngineToGame"),
            Self::GameToEngine => f.write_str("CladMismatchGameToEngine"),
        }
    }
}

/// Engine and client were built against different message catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{direction} - engine's hash ({}) != client's ({})", hex(.engine), hex(.client))]
pub struct VersionMismatch {
    /// Catalog whose fingerprint differs.
    pub direction: FingerprintDirection,
    /// Fingerprint reported by the engine.
    pub engine: Vec<u8>,
    /// Fingerprint the client expected.
    pub client: Vec<u8>,
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join("-")
}

/// Check the engine's reported fingerprints against `expected`.
///
/// The engine-to-controller fingerprint is checked first.
///
/// # Errors
///
/// Returns the first mismatching fingerprint.
pub fn validate(
    expected: &Fingerprints,
    identity: &UiDeviceConnected,
) -> std::result::Result<(), VersionMismatch> {
    let checks = [
        (
            FingerprintDirection::EngineToGame,
            &identity.to_game_hash,
            &expected.engine_to_game,
        ),
        (
            FingerprintDirection::GameToEngine,
            &identity.to_engine_hash,
            &expected.game_to_engine,
        ),
    ];

    for (direction, engine, client) in checks {
        if engine != client {
            return Err(VersionMismatch {
                direction,
                engine: engine.clone(),
                client: client.clone(),
            });
        }
    }
    Ok(())
}

/// Reply sent when validation fails.
pub fn wrong_version_reply(
    identity: &UiDeviceConnected,
    info: &ClientInfo,
) -> UiDeviceConnectionWrongVersion {
    UiDeviceConnectionWrongVersion {
        reserved: 0,
        connection_type: identity.connection_type,
        device_id: identity.device_id,
        build_version: info.build_version.clone(),
    }
}

/// Reply sent when validation succeeds.
pub fn success_reply(identity: &UiDeviceConnected, info: &ClientInfo) -> UiDeviceConnectionSuccess {
    UiDeviceConnectionSuccess {
        connection_type: identity.connection_type,
        device_id: identity.device_id,
        build_version: info.build_version.clone(),
        sdk_module_version: info.sdk_module_version.clone(),
        platform_version: info.platform_version.clone(),
        platform_implementation: info.platform_implementation.clone(),
        os_version: info.os_version.clone(),
        cpu_version: info.cpu_version.clone(),
    }
}
