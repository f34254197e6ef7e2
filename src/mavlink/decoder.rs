//! # MAVLink Packet Decoder
//!
//! Streaming one-byte-at-a-time MAVLink v1 parser plus payload decoders for
//! the telemetry messages this bridge consumes (PARAM_VALUE, SYSTEM_TIME,
//! RC_CHANNELS).
//!
//! The parser keeps running totals of parsed frames and dropped frames.
//! Stray bytes encountered while hunting for a start byte are not drops;
//! a checksum mismatch on a known message is. The dispatcher uses the drop
//! counter to detect framing faults and resynchronize (see
//! [`super::router::PacketRouter`]).

use super::crc::crc_accumulate;
use super::protocol::*;
use crate::error::{Result, RovBridgeError};

/// Streaming MAVLink v1 frame parser
#[derive(Debug)]
pub struct MavParser {
    state: ParseState,
    payload_len: usize,
    system_id: u8,
    component_id: u8,
    msg_id: u8,
    payload: Vec<u8>,
    /// Checksum accumulated over length..payload
    crc: u16,
    crc_low: u8,
    frames_parsed: u64,
    drop_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Idle,
    Length,
    Seq,
    SystemId,
    ComponentId,
    MsgId,
    Payload,
    CrcLow,
    CrcHigh,
}

impl Default for MavParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MavParser {
    /// Creates a parser hunting for a start byte.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            payload_len: 0,
            system_id: 0,
            component_id: 0,
            msg_id: 0,
            payload: Vec::new(),
            crc: 0xFFFF,
            crc_low: 0,
            frames_parsed: 0,
            drop_count: 0,
        }
    }

    /// Total frames parsed and verified so far.
    #[must_use]
    pub fn frames_parsed(&self) -> u64 {
        self.frames_parsed
    }

    /// Total frames dropped so far (checksum mismatch).
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.drop_count
    }

    /// Feed one byte into the parser.
    ///
    /// Returns a complete frame when the byte finishes one. Frames carrying
    /// a message id this bridge has no checksum seed for are skipped
    /// without being counted as drops.
    pub fn push_byte(&mut self, byte: u8) -> Option<MavFrame> {
        match self.state {
            ParseState::Idle => {
                if byte == MAVLINK_STX {
                    self.begin_frame();
                }
                None
            }
            ParseState::Length => {
                self.payload_len = byte as usize;
                self.crc = crc_accumulate(byte, self.crc);
                self.state = ParseState::Seq;
                None
            }
            ParseState::Seq => {
                self.crc = crc_accumulate(byte, self.crc);
                self.state = ParseState::SystemId;
                None
            }
            ParseState::SystemId => {
                self.system_id = byte;
                self.crc = crc_accumulate(byte, self.crc);
                self.state = ParseState::ComponentId;
                None
            }
            ParseState::ComponentId => {
                self.component_id = byte;
                self.crc = crc_accumulate(byte, self.crc);
                self.state = ParseState::MsgId;
                None
            }
            ParseState::MsgId => {
                self.msg_id = byte;
                self.crc = crc_accumulate(byte, self.crc);
                self.state = if self.payload_len == 0 {
                    ParseState::CrcLow
                } else {
                    ParseState::Payload
                };
                None
            }
            ParseState::Payload => {
                self.payload.push(byte);
                self.crc = crc_accumulate(byte, self.crc);
                if self.payload.len() == self.payload_len {
                    self.state = ParseState::CrcLow;
                }
                None
            }
            ParseState::CrcLow => {
                self.crc_low = byte;
                self.state = ParseState::CrcHigh;
                None
            }
            ParseState::CrcHigh => {
                let received = u16::from_le_bytes([self.crc_low, byte]);
                let frame = self.finish_frame(received);
                self.state = ParseState::Idle;
                frame
            }
        }
    }

    fn begin_frame(&mut self) {
        self.state = ParseState::Length;
        self.payload.clear();
        self.crc = 0xFFFF;
    }

    fn finish_frame(&mut self, received_crc: u16) -> Option<MavFrame> {
        let Some(extra) = crc_extra(self.msg_id) else {
            // Message outside the spoken subset: skip, not a drop
            return None;
        };

        if crc_accumulate(extra, self.crc) != received_crc {
            self.drop_count += 1;
            return None;
        }

        self.frames_parsed += 1;
        Some(MavFrame {
            system_id: self.system_id,
            component_id: self.component_id,
            msg_id: self.msg_id,
            payload: std::mem::take(&mut self.payload),
        })
    }
}

/// Decode a PARAM_VALUE payload
///
/// # Errors
///
/// Returns error if the payload is shorter than the 25-byte wire layout or
/// the parameter name is not valid UTF-8.
pub fn decode_param_value(frame: &MavFrame) -> Result<ParamValue> {
    let p = &frame.payload;
    if p.len() < 25 {
        return Err(RovBridgeError::MavlinkProtocol(format!(
            "PARAM_VALUE payload too short: {} bytes",
            p.len()
        )));
    }

    Ok(ParamValue {
        param_value: f32::from_le_bytes([p[0], p[1], p[2], p[3]]),
        param_count: u16::from_le_bytes([p[4], p[5]]),
        param_index: u16::from_le_bytes([p[6], p[7]]),
        param_id: decode_param_id(&p[8..24])?,
        param_type: p[24],
    })
}

/// Decode a SYSTEM_TIME payload
pub fn decode_system_time(frame: &MavFrame) -> Result<SystemTime> {
    let p = &frame.payload;
    if p.len() < 12 {
        return Err(RovBridgeError::MavlinkProtocol(format!(
            "SYSTEM_TIME payload too short: {} bytes",
            p.len()
        )));
    }

    Ok(SystemTime {
        time_unix_usec: u64::from_le_bytes([p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]]),
        time_boot_ms: u32::from_le_bytes([p[8], p[9], p[10], p[11]]),
    })
}

/// Decode an RC_CHANNELS payload, keeping the first 11 channels
pub fn decode_rc_channels(frame: &MavFrame) -> Result<RcChannelsFeedback> {
    let p = &frame.payload;
    if p.len() < 42 {
        return Err(RovBridgeError::MavlinkProtocol(format!(
            "RC_CHANNELS payload too short: {} bytes",
            p.len()
        )));
    }

    let mut channels = [0u16; 11];
    for (i, chan) in channels.iter_mut().enumerate() {
        let off = 4 + i * 2;
        *chan = u16::from_le_bytes([p[off], p[off + 1]]);
    }

    Ok(RcChannelsFeedback {
        time_boot_ms: u32::from_le_bytes([p[0], p[1], p[2], p[3]]),
        channels,
        chancount: p[40],
        rssi: p[41],
    })
}
