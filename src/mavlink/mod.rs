//! # MAVLink Protocol Module
//!
//! MAVLink v1 subset spoken to the ArduSub autopilot.
//!
//! This module handles:
//! - Outbound frame encoding (heartbeat, parameter protocol, control
//!   claim/release, mode, arm, RC override)
//! - Streaming inbound parsing with drop-count tracking
//! - CRC-16/MCRF4XX checksum calculation with per-message CRC_EXTRA
//! - Message-id -> handler dispatch

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod router;
pub mod crc;
