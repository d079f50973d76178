//! Payload structs for every catalog message.

use serde::{Deserialize, Serialize};

use super::{RobotAction, RobotActionType};

/// How the peer is attached to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiConnectionType {
    UiOverUdp,
    UiOverTcp,
    SdkOverUdp,
    SdkOverTcp,
    Switchboard,
}

/// Where a queued action is placed relative to the engine's action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueActionPosition {
    Now,
    NowAndClearRemaining,
    Next,
    AtEnd,
    NowAndResume,
    InParallel,
}

/// Outcome reported when an action finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Running,
    FailureTimeout,
    FailureProcessing,
    FailureRetry,
    FailureAbort,
    Cancelled,
    Interrupted,
}

/// Which list an [`EndOfMessage`] terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndOfMessageType {
    Animation,
    AnimationGroup,
}

/// Keep-alive ping. Sent by both sides; replies set `is_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub counter: u32,
    pub time_sent_ms: f64,
    pub is_response: bool,
}

/// Identity message the engine sends right after the socket connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiDeviceConnected {
    pub connection_type: UiConnectionType,
    pub device_id: u8,
    pub robot_id: u32,
    pub success: bool,
    /// Fingerprint of the engine-to-controller catalog.
    pub to_game_hash: Vec<u8>,
    /// Fingerprint of the controller-to-engine catalog.
    pub to_engine_hash: Vec<u8>,
    pub build_version: String,
}

/// Handshake reply when either fingerprint disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiDeviceConnectionWrongVersion {
    pub reserved: u8,
    pub connection_type: UiConnectionType,
    pub device_id: u8,
    pub build_version: String,
}

/// Handshake reply when both fingerprints match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiDeviceConnectionSuccess {
    pub connection_type: UiConnectionType,
    pub device_id: u8,
    pub build_version: String,
    pub sdk_module_version: String,
    pub platform_version: String,
    pub platform_implementation: String,
    pub os_version: String,
    pub cpu_version: String,
}

/// Queue one action on the robot. `id_tag` correlates the completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSingleAction {
    pub id_tag: u32,
    pub num_retries: u8,
    pub position: QueueActionPosition,
    pub action: RobotAction,
}

/// Cancel a queued or running action by its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelActionByIdTag {
    pub id_tag: u32,
}

/// Completion notification for a previously queued action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotCompletedAction {
    pub robot_id: u32,
    pub id_tag: u32,
    pub action_type: RobotActionType,
    pub result: ActionResult,
}

/// Periodic robot state broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub robot_id: u32,
    pub battery_voltage: f32,
    pub lift_height_mm: f32,
    pub head_angle_rad: f32,
}

/// Ask the engine to list the animations it can play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestAvailableAnimations;

/// One entry of the animation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationAvailable {
    pub anim_name: String,
}

/// Marks the end of a list of messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOfMessage {
    pub message_type: EndOfMessageType,
}

/// Set speaker volume, 0.0 to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRobotVolume {
    pub volume: f32,
}

/// Move the lift. 32 mm is the lowest position, 92 mm the highest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLiftHeight {
    pub height_mm: f32,
    pub max_speed_rad_per_sec: f32,
    pub accel_rad_per_sec2: f32,
    pub duration_sec: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetHeadAngle {
    pub angle_rad: f32,
    pub max_speed_rad_per_sec: f32,
    pub accel_rad_per_sec2: f32,
    pub duration_sec: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayAnimation {
    pub num_loops: u32,
    pub anim_name: String,
    pub ignore_body_track: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SayText {
    pub text: String,
    pub play_excited_animation: bool,
}
