//! # MAVLink Protocol Constants and Types
//!
//! Core protocol definitions for the MAVLink v1 subset spoken to an ArduSub
//! autopilot. Field layouts follow the standard message definitions
//! bit-for-bit (payload fields in size-sorted wire order, little-endian).

use crate::error::{Result, RovBridgeError};

/// MAVLink v1 frame start byte
pub const MAVLINK_STX: u8 = 0xFE;

/// Frame overhead: stx(1) + len(1) + seq(1) + sysid(1) + compid(1) + msgid(1) + crc(2)
pub const MAVLINK_FRAME_OVERHEAD: usize = 8;

/// Maximum payload length (length field is one byte)
pub const MAVLINK_MAX_PAYLOAD: usize = 255;

/// HEARTBEAT message id
pub const MSG_ID_HEARTBEAT: u8 = 0;
/// SYSTEM_TIME message id
pub const MSG_ID_SYSTEM_TIME: u8 = 2;
/// CHANGE_OPERATOR_CONTROL message id
pub const MSG_ID_CHANGE_OPERATOR_CONTROL: u8 = 5;
/// SET_MODE message id
pub const MSG_ID_SET_MODE: u8 = 11;
/// PARAM_REQUEST_READ message id
pub const MSG_ID_PARAM_REQUEST_READ: u8 = 20;
/// PARAM_REQUEST_LIST message id
pub const MSG_ID_PARAM_REQUEST_LIST: u8 = 21;
/// PARAM_VALUE message id
pub const MSG_ID_PARAM_VALUE: u8 = 22;
/// PARAM_SET message id
pub const MSG_ID_PARAM_SET: u8 = 23;
/// RC_CHANNELS message id
pub const MSG_ID_RC_CHANNELS: u8 = 65;
/// RC_CHANNELS_OVERRIDE message id
pub const MSG_ID_RC_CHANNELS_OVERRIDE: u8 = 70;
/// COMMAND_LONG message id
pub const MSG_ID_COMMAND_LONG: u8 = 76;

/// Arm/disarm command number (MAV_CMD_COMPONENT_ARM_DISARM)
pub const MAV_CMD_COMPONENT_ARM_DISARM: u16 = 400;

/// Ground control station vehicle type (MAV_TYPE_GCS)
pub const MAV_TYPE_GCS: u8 = 6;
/// No valid autopilot (MAV_AUTOPILOT_INVALID)
pub const MAV_AUTOPILOT_INVALID: u8 = 8;
/// Custom-mode-enabled base mode flag
pub const MAV_MODE_FLAG_CUSTOM_MODE_ENABLED: u8 = 1;
/// Parameter type used for every parameter write (MAV_PARAM_TYPE_UINT8)
pub const MAV_PARAM_TYPE_UINT8: u8 = 1;

/// Parameter id field width on the wire
pub const PARAM_ID_LEN: usize = 16;

/// ArduSub custom flight modes
pub mod sub_mode {
    /// Attitude stabilization
    pub const STABILIZE: u32 = 0;
    /// Depth hold
    pub const DEPTH_HOLD: u32 = 2;
    /// Position hold
    pub const POS_HOLD: u32 = 16;
    /// Direct manual control
    pub const MANUAL: u32 = 19;
}

/// Look up the CRC_EXTRA seed for a message id
///
/// Only the messages this bridge speaks are listed; an unknown id returns
/// `None` and the frame is counted as a drop by the parser.
pub fn crc_extra(msg_id: u8) -> Option<u8> {
    match msg_id {
        MSG_ID_HEARTBEAT => Some(50),
        MSG_ID_SYSTEM_TIME => Some(137),
        MSG_ID_CHANGE_OPERATOR_CONTROL => Some(217),
        MSG_ID_SET_MODE => Some(89),
        MSG_ID_PARAM_REQUEST_READ => Some(214),
        MSG_ID_PARAM_REQUEST_LIST => Some(159),
        MSG_ID_PARAM_VALUE => Some(220),
        MSG_ID_PARAM_SET => Some(168),
        MSG_ID_RC_CHANNELS => Some(118),
        MSG_ID_RC_CHANNELS_OVERRIDE => Some(124),
        MSG_ID_COMMAND_LONG => Some(152),
        _ => None,
    }
}

/// A decoded MAVLink frame: routing header plus raw payload
#[derive(Debug, Clone)]
pub struct MavFrame {
    /// Sender system id
    pub system_id: u8,
    /// Sender component id
    pub component_id: u8,
    /// Message type identifier
    pub msg_id: u8,
    /// Raw payload bytes (wire order)
    pub payload: Vec<u8>,
}

/// PARAM_VALUE payload
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    /// Parameter name (null padding stripped)
    pub param_id: String,
    /// Current value
    pub param_value: f32,
    /// Total parameter count on the vehicle
    pub param_count: u16,
    /// Index of this parameter
    pub param_index: u16,
    /// Declared on-wire type
    pub param_type: u8,
}

/// SYSTEM_TIME payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemTime {
    /// Epoch time in microseconds
    pub time_unix_usec: u64,
    /// Milliseconds since autopilot boot
    pub time_boot_ms: u32,
}

/// RC_CHANNELS telemetry payload (first 11 of 18 channels retained)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcChannelsFeedback {
    /// Milliseconds since autopilot boot
    pub time_boot_ms: u32,
    /// Channel PWM readings, channels 1-11
    pub channels: [u16; 11],
    /// Number of valid channels reported
    pub chancount: u8,
    /// Receive signal strength (255 = unknown)
    pub rssi: u8,
}

/// Encode a parameter name into its fixed-width wire field
///
/// Names shorter than 16 bytes are null padded; longer names are truncated
/// (the autopilot's parameter names never exceed the field).
pub fn encode_param_id(name: &str) -> [u8; PARAM_ID_LEN] {
    let mut field = [0u8; PARAM_ID_LEN];
    for (dst, src) in field.iter_mut().zip(name.as_bytes()) {
        *dst = *src;
    }
    field
}

/// Decode a fixed-width parameter name field
///
/// # Errors
///
/// Returns error if the field is not valid UTF-8 after null stripping.
pub fn decode_param_id(field: &[u8]) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(str::to_owned)
        .map_err(|e| RovBridgeError::MavlinkProtocol(format!("Invalid param_id: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(MAVLINK_STX, 0xFE);
        assert_eq!(MAVLINK_FRAME_OVERHEAD, 8);
        assert_eq!(MAVLINK_MAX_PAYLOAD, 255);
        assert_eq!(MSG_ID_PARAM_VALUE, 22);
        assert_eq!(MSG_ID_RC_CHANNELS_OVERRIDE, 70);
    }

    #[test]
    fn test_crc_extra_known_messages() {
        assert_eq!(crc_extra(MSG_ID_HEARTBEAT), Some(50));
        assert_eq!(crc_extra(MSG_ID_PARAM_VALUE), Some(220));
        assert_eq!(crc_extra(MSG_ID_COMMAND_LONG), Some(152));
    }

    #[test]
    fn test_crc_extra_unknown_message() {
        assert_eq!(crc_extra(255), None);
    }

    #[test]
    fn test_sub_modes() {
        assert_eq!(sub_mode::STABILIZE, 0);
        assert_eq!(sub_mode::DEPTH_HOLD, 2);
        assert_eq!(sub_mode::POS_HOLD, 16);
        assert_eq!(sub_mode::MANUAL, 19);
    }

    #[test]
    fn test_encode_param_id_pads_with_nulls() {
        let field = encode_param_id("SYSID_MYGCS");
        assert_eq!(&field[..11], b"SYSID_MYGCS");
        assert!(field[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_param_id_full_width() {
        let field = encode_param_id("JS_CAM_TILT_STEP");
        assert_eq!(&field, b"JS_CAM_TILT_STEP");
    }

    #[test]
    fn test_decode_param_id_strips_padding() {
        let mut field = [0u8; PARAM_ID_LEN];
        field[..9].copy_from_slice(b"JS_THR_GA");
        let name = decode_param_id(&field).unwrap();
        assert_eq!(name, "JS_THR_GA");
    }

    #[test]
    fn test_param_id_roundtrip_full_width() {
        let field = encode_param_id("JS_LIGHTS_STEPS0");
        assert_eq!(decode_param_id(&field).unwrap(), "JS_LIGHTS_STEPS0");
    }

    #[test]
    fn test_decode_param_id_rejects_invalid_utf8() {
        let field = [0xFFu8; PARAM_ID_LEN];
        assert!(decode_param_id(&field).is_err());
    }
}
