//! # Outbound Command Module
//!
//! Protocol intents produced by the action translator and the handshake
//! state machine. The connection supervisor turns each intent into wire
//! bytes (or a host-side call) in the order produced.

/// Control-loop bits requested from the downstream host framework.
pub mod control_loops {
    /// Yaw rate loop
    pub const YAW_RATE: u32 = 1 << 0;
    /// Pitch loop
    pub const PITCH: u32 = 1 << 1;
    /// Roll loop
    pub const ROLL: u32 = 1 << 2;
    /// Depth loop
    pub const DEPTH: u32 = 1 << 3;
    /// Throttle loop
    pub const THROTTLE: u32 = 1 << 4;

    /// Loops enabled for a teleoperation session
    pub const TELEOPERATION: u32 = YAW_RATE | PITCH | ROLL | DEPTH | THROTTLE;
}

/// One outbound protocol or host intent
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Request the vehicle's full parameter list
    RequestParamList,
    /// Request one named parameter
    RequestParam(String),
    /// Write one named parameter
    SetParam { name: String, value: f32 },
    /// Claim exclusive operator control
    TakeControl,
    /// Release operator control
    ReleaseControl,
    /// Switch the vehicle flight mode
    SetMode(u32),
    /// Arm the vehicle
    Arm,
    /// Disarm the vehicle
    Disarm,
    /// Drive every actuator channel to idle and transmit
    IdleActuators,
    /// Enable downstream control-loop consumers
    EnableControlLoops(u32),
}
