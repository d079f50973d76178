//! Message catalog - the tagged unions carried inside frames.
//!
//! Two disjoint universes exist:
//! - [`Inbound`] - engine to controller
//! - [`Outbound`] - controller to engine
//!
//! Each union variant wraps a payload struct of the same name, and each
//! union has a matching tag enum ([`InboundKind`], [`OutboundKind`]) used
//! for dispatch and logging. Actions queued on the engine are themselves a
//! union, [`RobotAction`], whose tag enum [`RobotActionType`] comes back in
//! completion notifications.

mod types;
pub mod version;

use serde::{Deserialize, Serialize};

pub use types::{
    ActionResult, AnimationAvailable, CancelActionByIdTag, EndOfMessage, EndOfMessageType,
    PlayAnimation, Ping, QueueActionPosition, QueueSingleAction, RequestAvailableAnimations,
    RobotCompletedAction, RobotState, SayText, SetHeadAngle, SetLiftHeight, SetRobotVolume,
    UiConnectionType, UiDeviceConnected, UiDeviceConnectionSuccess,
    UiDeviceConnectionWrongVersion,
};

/// Declares a union over payload structs plus its tag enum.
macro_rules! message_union {
    (
        $(#[$meta:meta])*
        pub enum $union:ident / $kind:ident {
            $($variant:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum $union {
            $($variant($variant),)+
        }

        /// Tag identifying one variant of the union.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $kind {
            $($variant,)+
        }

        impl $kind {
            /// Variant name, as it appears on the wire.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl std::fmt::Display for $kind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl $union {
            /// Tag of this message.
            pub fn kind(&self) -> $kind {
                match self {
                    $(Self::$variant(_) => $kind::$variant,)+
                }
            }

            /// Tag name of this message, for logging.
            pub fn tag(&self) -> &'static str {
                self.kind().name()
            }
        }

        $(
            impl From<$variant> for $union {
                fn from(message: $variant) -> Self {
                    Self::$variant(message)
                }
            }
        )+
    };
}

message_union! {
    /// Messages sent by the engine to the controller.
    pub enum Inbound / InboundKind {
        Ping,
        UiDeviceConnected,
        RobotCompletedAction,
        RobotState,
        AnimationAvailable,
        EndOfMessage,
    }
}

message_union! {
    /// Messages sent by the controller to the engine.
    pub enum Outbound / OutboundKind {
        Ping,
        UiDeviceConnectionWrongVersion,
        UiDeviceConnectionSuccess,
        QueueSingleAction,
        CancelActionByIdTag,
        RequestAvailableAnimations,
        SetRobotVolume,
    }
}

message_union! {
    /// Actions that can be queued on the engine.
    pub enum RobotAction / RobotActionType {
        SetLiftHeight,
        SetHeadAngle,
        PlayAnimation,
        SayText,
    }
}

impl Inbound {
    /// Robot id carried by this message, if its type has one.
    pub fn peer_id(&self) -> Option<u32> {
        match self {
            Self::UiDeviceConnected(m) => Some(m.robot_id),
            Self::RobotCompletedAction(m) => Some(m.robot_id),
            Self::RobotState(m) => Some(m.robot_id),
            Self::Ping(_) | Self::AnimationAvailable(_) | Self::EndOfMessage(_) => None,
        }
    }
}

impl RobotAction {
    /// Type reported back in the completion notification for this action.
    pub fn action_type(&self) -> RobotActionType {
        self.kind()
    }
}

/// A payload struct that can be received from the engine.
///
/// Callbacks are registered against a concrete payload type, so a callback
/// can only ever be handed the payload it asked for.
pub trait InboundMessage: Sized + Send + Sync + 'static {
    /// Tag of the union variant wrapping this payload.
    const KIND: InboundKind;

    /// Borrow the payload out of a union value of the matching variant.
    fn extract(message: &Inbound) -> Option<&Self>;
}

macro_rules! impl_inbound_message {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl InboundMessage for $variant {
                const KIND: InboundKind = InboundKind::$variant;

                fn extract(message: &Inbound) -> Option<&Self> {
                    match message {
                        Inbound::$variant(m) => Some(m),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_inbound_message!(
    Ping,
    UiDeviceConnected,
    RobotCompletedAction,
    RobotState,
    AnimationAvailable,
    EndOfMessage,
);
