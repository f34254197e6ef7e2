//! # Parameter Registry Module
//!
//! Shadow copy of remote autopilot parameters, updated only by inbound
//! PARAM_VALUE messages. Entries are never deleted; a reconnect simply
//! refreshes them.

use std::collections::HashMap;

/// Joystick tuning parameters requested at session start, in request order
pub const JS_PARAMS: [&str; 6] = [
    "JS_CAM_TILT_STEP",
    "JS_GAIN_MAX",
    "JS_GAIN_MIN",
    "JS_GAIN_STEPS",
    "JS_LIGHTS_STEPS",
    "JS_THR_GAIN",
];

/// Camera tilt step parameter
pub const PARAM_CAM_TILT_STEP: &str = JS_PARAMS[0];
/// Gain step parameter
pub const PARAM_GAIN_STEPS: &str = JS_PARAMS[3];
/// Light step parameter
pub const PARAM_LIGHTS_STEPS: &str = JS_PARAMS[4];
/// Throttle gain parameter
pub const PARAM_THR_GAIN: &str = JS_PARAMS[5];

/// Controlling ground station id parameter
pub const PARAM_GCS_OWNER: &str = "SYSID_MYGCS";
/// Ground-station-lost failsafe parameter
pub const PARAM_GCS_FAILSAFE: &str = "FS_GCS_ENABLE";

/// Failsafe action: hold depth when the GCS heartbeat is lost
/// (0 disabled, 1 warn, 2 disarm, 3 depth hold, 4 surface)
pub const GCS_FAILSAFE_DEPTH_HOLD: f32 = 3.0;

/// Last-known remote parameter values by name
#[derive(Debug, Clone, Default)]
pub struct ParamRegistry {
    values: HashMap<String, f32>,
}

impl ParamRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received value, returning the previous one if any.
    pub fn update(&mut self, name: &str, value: f32) -> Option<f32> {
        self.values.insert(name.to_owned(), value)
    }

    /// Last-known value for a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }

    /// Number of distinct parameters seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no parameter has been received yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_get() {
        let mut registry = ParamRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.update("JS_THR_GAIN", 0.8), None);
        assert_eq!(registry.get("JS_THR_GAIN"), Some(0.8));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_returns_previous_value() {
        let mut registry = ParamRegistry::new();
        registry.update("SYSID_MYGCS", 1.0);
        assert_eq!(registry.update("SYSID_MYGCS", 254.0), Some(1.0));
        assert_eq!(registry.get("SYSID_MYGCS"), Some(254.0));
        assert_eq!(registry.len(), 1, "entries are replaced, never duplicated");
    }

    #[test]
    fn test_unknown_parameter_is_none() {
        let registry = ParamRegistry::new();
        assert_eq!(registry.get("FS_GCS_ENABLE"), None);
    }

    #[test]
    fn test_js_param_names() {
        assert_eq!(JS_PARAMS.len(), 6);
        assert_eq!(PARAM_THR_GAIN, "JS_THR_GAIN");
        assert_eq!(PARAM_CAM_TILT_STEP, "JS_CAM_TILT_STEP");
        assert_eq!(PARAM_LIGHTS_STEPS, "JS_LIGHTS_STEPS");
        // All names fit the 16-byte wire field
        for name in JS_PARAMS {
            assert!(name.len() <= 16);
        }
    }
}
