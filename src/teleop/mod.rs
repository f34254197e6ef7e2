//! # Teleoperation Module
//!
//! Operator-intent handling for the vehicle bridge.
//!
//! This module handles:
//! - Parsing operator-intent events (axes and named buttons)
//! - Gain/trim/step state and axis-to-channel translation
//! - The parameter-sync and control-claim handshake
//! - The shadow registry of remote parameters

pub mod actions;
pub mod channel;
pub mod command;
pub mod handshake;
pub mod params;
pub mod translator;
