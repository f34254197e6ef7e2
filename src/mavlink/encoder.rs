//! # MAVLink Packet Encoder
//!
//! Builds outbound MAVLink v1 frames for the GCS side of the link:
//! heartbeat, parameter protocol, control claim/release, mode, arm and
//! RC override messages.

use bytes::{BufMut, BytesMut};

use super::crc::crc16_mcrf4xx;
use super::protocol::*;

/// Outbound frame builder
///
/// Owns the sender identity and the per-link sequence counter. Every pack
/// method returns a complete wire-ready frame.
///
/// # Examples
///
/// ```
/// use rov_bridge::mavlink::encoder::MavEncoder;
///
/// let mut encoder = MavEncoder::new(254, 1, 1, 1);
/// let frame = encoder.heartbeat(4);
/// assert_eq!(frame[0], 0xFE);
/// ```
#[derive(Debug)]
pub struct MavEncoder {
    /// Local system id
    system_id: u8,
    /// Local component id
    component_id: u8,
    /// Vehicle system id
    target_system: u8,
    /// Vehicle component id
    target_component: u8,
    /// Frame sequence counter (wraps)
    seq: u8,
}

impl MavEncoder {
    /// Creates an encoder for the given local and target identities.
    #[must_use]
    pub fn new(system_id: u8, component_id: u8, target_system: u8, target_component: u8) -> Self {
        Self {
            system_id,
            component_id,
            target_system,
            target_component,
            seq: 0,
        }
    }

    /// Wrap a payload into a complete v1 frame.
    fn frame(&mut self, msg_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(payload.len() + MAVLINK_FRAME_OVERHEAD);
        buf.put_u8(MAVLINK_STX);
        buf.put_u8(payload.len() as u8);
        buf.put_u8(self.seq);
        buf.put_u8(self.system_id);
        buf.put_u8(self.component_id);
        buf.put_u8(msg_id);
        buf.put_slice(payload);

        // Checksum covers everything after the start byte
        let extra = crc_extra(msg_id).unwrap_or_default();
        let crc = crc16_mcrf4xx(&buf[1..], extra);
        buf.put_u16_le(crc);

        self.seq = self.seq.wrapping_add(1);
        buf.to_vec()
    }

    /// HEARTBEAT announcing this bridge as a GCS
    ///
    /// # Arguments
    ///
    /// * `system_status` - MAV_STATE value mirroring the session status
    pub fn heartbeat(&mut self, system_status: u8) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(9);
        payload.put_u32_le(0); // custom_mode
        payload.put_u8(MAV_TYPE_GCS);
        payload.put_u8(MAV_AUTOPILOT_INVALID);
        payload.put_u8(0); // base_mode
        payload.put_u8(system_status);
        payload.put_u8(3); // mavlink_version
        self.frame(MSG_ID_HEARTBEAT, &payload)
    }

    /// PARAM_REQUEST_LIST for the full vehicle parameter set
    pub fn param_request_list(&mut self) -> Vec<u8> {
        let payload = [self.target_system, self.target_component];
        self.frame(MSG_ID_PARAM_REQUEST_LIST, &payload)
    }

    /// PARAM_REQUEST_READ for a single named parameter
    pub fn param_request_read(&mut self, name: &str) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(20);
        payload.put_i16_le(-1); // param_index: use the name
        payload.put_u8(self.target_system);
        payload.put_u8(self.target_component);
        payload.put_slice(&encode_param_id(name));
        self.frame(MSG_ID_PARAM_REQUEST_READ, &payload)
    }

    /// PARAM_SET writing a named parameter
    pub fn param_set(&mut self, name: &str, value: f32) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(23);
        payload.put_f32_le(value);
        payload.put_u8(self.target_system);
        payload.put_u8(self.target_component);
        payload.put_slice(&encode_param_id(name));
        payload.put_u8(MAV_PARAM_TYPE_UINT8);
        self.frame(MSG_ID_PARAM_SET, &payload)
    }

    /// CHANGE_OPERATOR_CONTROL claiming or releasing the vehicle
    ///
    /// # Arguments
    ///
    /// * `release` - false requests control of the vehicle, true releases it
    pub fn change_operator_control(&mut self, release: bool) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(28);
        payload.put_u8(self.target_system);
        payload.put_u8(u8::from(release)); // control_request
        payload.put_u8(0); // version
        payload.put_slice(&[0u8; 25]); // passkey (unused)
        self.frame(MSG_ID_CHANGE_OPERATOR_CONTROL, &payload)
    }

    /// SET_MODE switching the vehicle flight mode
    ///
    /// # Arguments
    ///
    /// * `custom_mode` - Opaque autopilot mode identifier (see [`sub_mode`])
    pub fn set_mode(&mut self, custom_mode: u32) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(6);
        payload.put_u32_le(custom_mode);
        payload.put_u8(self.target_system);
        payload.put_u8(MAV_MODE_FLAG_CUSTOM_MODE_ENABLED);
        self.frame(MSG_ID_SET_MODE, &payload)
    }

    /// COMMAND_LONG with the component arm/disarm command
    ///
    /// # Arguments
    ///
    /// * `arm` - true to arm, false to disarm
    pub fn command_arm_disarm(&mut self, arm: bool) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(33);
        payload.put_f32_le(if arm { 1.0 } else { 0.0 }); // param1
        for _ in 0..6 {
            payload.put_f32_le(0.0); // param2-7
        }
        payload.put_u16_le(MAV_CMD_COMPONENT_ARM_DISARM);
        payload.put_u8(self.target_system);
        payload.put_u8(self.target_component);
        payload.put_u8(0); // confirmation
        self.frame(MSG_ID_COMMAND_LONG, &payload)
    }

    /// RC_CHANNELS_OVERRIDE carrying the first eight actuator pulses
    ///
    /// The v1 override message has exactly eight channel fields; the light
    /// and video channels beyond them stay local.
    pub fn rc_channels_override(&mut self, pulses: &[u16; 8]) -> Vec<u8> {
        let mut payload = BytesMut::with_capacity(18);
        for &pwm in pulses {
            payload.put_u16_le(pwm);
        }
        payload.put_u8(self.target_system);
        payload.put_u8(self.target_component);
        self.frame(MSG_ID_RC_CHANNELS_OVERRIDE, &payload)
    }
}
