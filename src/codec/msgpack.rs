//! MsgPack codec using `rmp-serde`.
//!
//! Structs are written as maps (`to_vec_named`) so that fields can be
//! added to the catalog without breaking positional decoding on the
//! other side. Enums use serde's external tagging: the variant name is
//! the message tag.

use std::io::Cursor;

use crate::error::Result;

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value, ignoring any trailing bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Decode a value and report how many bytes the decoder consumed.
    ///
    /// Framing uses the count to check that a frame's declared length
    /// matches the encoded message exactly.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    pub fn decode_counted<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<(T, usize)> {
        let mut cursor = Cursor::new(bytes);
        let value = rmp_serde::from_read(&mut cursor)?;
        Ok((value, cursor.position() as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{
        ActionResult, Inbound, Outbound, QueueActionPosition, QueueSingleAction, RobotAction,
        RobotActionType, RobotCompletedAction, SetLiftHeight, UiConnectionType, UiDeviceConnected,
    };

    #[test]
    fn test_inbound_roundtrip_reports_full_length() {
        let original = Inbound::from(UiDeviceConnected {
            connection_type: UiConnectionType::SdkOverTcp,
            device_id: 1,
            robot_id: 3,
            success: true,
            to_game_hash: vec![0xAA; 16],
            to_engine_hash: vec![0xBB; 16],
            build_version: "0.1.0".to_string(),
        });

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let (decoded, consumed): (Inbound, usize) = MsgPackCodec::decode_counted(&encoded).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn test_decode_counted_stops_at_message_end() {
        let original = Inbound::from(RobotCompletedAction {
            robot_id: 1,
            id_tag: 2_000_001,
            action_type: RobotActionType::SetLiftHeight,
            result: ActionResult::Success,
        });

        let mut encoded = MsgPackCodec::encode(&original).unwrap();
        let message_len = encoded.len();
        encoded.extend_from_slice(&[0xC0, 0xC0, 0xC0]);

        let (decoded, consumed): (Inbound, usize) = MsgPackCodec::decode_counted(&encoded).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(consumed, message_len);
    }

    #[test]
    fn test_outbound_nested_action_union() {
        let original = Outbound::from(QueueSingleAction {
            id_tag: 2_000_042,
            num_retries: 1,
            position: QueueActionPosition::InParallel,
            action: RobotAction::from(SetLiftHeight {
                height_mm: 92.0,
                max_speed_rad_per_sec: 10.0,
                accel_rad_per_sec2: 10.0,
                duration_sec: 2.0,
            }),
        });

        let encoded = MsgPackCodec::encode(&original).unwrap();
        let decoded: Outbound = MsgPackCodec::decode(&encoded).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_structs_encode_as_maps() {
        #[derive(serde::Serialize)]
        struct Pair {
            a: u8,
            b: u8,
        }

        let encoded = MsgPackCodec::encode(&Pair { a: 1, b: 2 }).unwrap();

        // 0x82 = fixmap with 2 entries
        assert_eq!(encoded[0], 0x82);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<Inbound> = MsgPackCodec::decode(&[0xC1]);
        assert!(result.is_err());
    }
}
