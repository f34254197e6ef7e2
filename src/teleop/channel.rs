//! # Channel Mapping Module
//!
//! Converts normalized operator inputs into bounded actuator pulse widths.
//!
//! ## Channel Assignments
//!
//! | Channel | Input | Function |
//! |---------|-------|----------|
//! | CH1 | Pitch axis | Vehicle pitch |
//! | CH2 | Roll axis | Vehicle roll |
//! | CH3 | Throttle axis | Vertical thrust |
//! | CH4 | Heading axis | Yaw |
//! | CH5 | Forward axis | Surge |
//! | CH6 | Lateral axis | Sway |
//! | CH7 | - | Camera pan |
//! | CH8 | Tilt buttons | Camera tilt |
//! | CH9 | Light buttons | Lights bank 1 |
//! | CH10 | Light buttons | Lights bank 2 |
//! | CH11 | - | Video switch |
//!
//! ## Value Ranges
//!
//! - Normalized input: the channel's configured `[val_min, val_max]` range,
//!   neutral at `val_neutral`
//! - Pulse output: 1100-1900 µs, idle at 1500 µs
//!
//! ## Usage
//!
//! ```
//! use rov_bridge::teleop::channel::{map_to_pulse, ChannelCalibration, PWM_IDLE};
//!
//! let cal = ChannelCalibration::default();
//! assert_eq!(map_to_pulse(&cal, 0.0), PWM_IDLE);
//! ```

/// Highest pulse width the autopilot accepts
pub const PWM_MAX: f32 = 1900.0;
/// Lowest pulse width the autopilot accepts
pub const PWM_MIN: f32 = 1100.0;
/// Neutral pulse width
pub const PWM_IDLE: f32 = 1500.0;

/// Number of actuator channels
pub const CHANNEL_COUNT: usize = 11;

/// Channel indices for semantic access.
pub mod channels {
    /// Vehicle pitch
    pub const PITCH: usize = 0;
    /// Vehicle roll
    pub const ROLL: usize = 1;
    /// Vertical thrust
    pub const THROTTLE: usize = 2;
    /// Yaw
    pub const HEADING: usize = 3;
    /// Surge
    pub const FORWARD: usize = 4;
    /// Sway
    pub const LATERAL: usize = 5;
    /// Camera pan
    pub const CAMERA_PAN: usize = 6;
    /// Camera tilt
    pub const CAMERA_TILT: usize = 7;
    /// Lights bank 1
    pub const LIGHTS_1: usize = 8;
    /// Lights bank 2
    pub const LIGHTS_2: usize = 9;
    /// Video switch
    pub const VIDEO_SWITCH: usize = 10;
}

/// Calibration for one actuator channel
///
/// The normalized input range is configured per axis; the pulse range is
/// fixed by the autopilot. `reverse` is toggled per update by the action
/// translator based on the sign of the input relative to neutral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    /// Lowest expected normalized input
    pub val_min: f32,
    /// Highest expected normalized input
    pub val_max: f32,
    /// Normalized input mapped to the neutral pulse
    pub val_neutral: f32,
    /// Pulse emitted at `val_min`
    pub pwm_min: f32,
    /// Pulse emitted at `val_max`
    pub pwm_max: f32,
    /// Pulse emitted at `val_neutral`
    pub pwm_neutral: f32,
    /// Invert the mapping direction around neutral
    pub reverse: bool,
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self {
            val_min: -1000.0,
            val_max: 1000.0,
            val_neutral: 0.0,
            pwm_min: PWM_MIN,
            pwm_max: PWM_MAX,
            pwm_neutral: PWM_IDLE,
            reverse: false,
        }
    }
}

impl ChannelCalibration {
    /// Creates a calibration with the given normalized input range and the
    /// standard pulse range.
    #[must_use]
    pub fn with_range(val_min: f32, val_max: f32, val_neutral: f32) -> Self {
        Self {
            val_min,
            val_max,
            val_neutral,
            ..Self::default()
        }
    }
}

/// Maps a normalized input value to an actuator pulse width.
///
/// Linear interpolation between `pwm_min` and `pwm_max` with the channel's
/// neutral point as the inflection. Inputs outside the declared range
/// extrapolate linearly and the result is clamped into the pulse range, so
/// the output always lies in `[pwm_min, pwm_max]`. With `reverse` set, the
/// mapping is mirrored around the neutral pulse.
///
/// Callers substitute the idle pulse themselves when the input is absent;
/// this function expects a finite value.
///
/// # Examples
///
/// ```
/// use rov_bridge::teleop::channel::{map_to_pulse, ChannelCalibration};
///
/// let cal = ChannelCalibration::with_range(-180.0, 180.0, 0.0);
/// assert_eq!(map_to_pulse(&cal, 180.0), 1900.0);
/// assert_eq!(map_to_pulse(&cal, -180.0), 1100.0);
/// ```
#[must_use]
pub fn map_to_pulse(cal: &ChannelCalibration, value: f32) -> f32 {
    let pulse = if value >= cal.val_neutral {
        let span = cal.val_max - cal.val_neutral;
        if span == 0.0 {
            cal.pwm_neutral
        } else {
            cal.pwm_neutral + (value - cal.val_neutral) / span * (cal.pwm_max - cal.pwm_neutral)
        }
    } else {
        let span = cal.val_neutral - cal.val_min;
        if span == 0.0 {
            cal.pwm_neutral
        } else {
            cal.pwm_neutral - (cal.val_neutral - value) / span * (cal.pwm_neutral - cal.pwm_min)
        }
    };

    let pulse = if cal.reverse {
        2.0 * cal.pwm_neutral - pulse
    } else {
        pulse
    };

    pulse.clamp(cal.pwm_min, cal.pwm_max)
}

/// The per-channel pulse state transmitted to the vehicle
///
/// Axis channels are fully recomputed every update; camera tilt and the
/// light levels are stepped from their current value instead, so the
/// vector is the single owner of that persistent state.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorVector {
    pwm: [f32; CHANNEL_COUNT],
}

impl Default for ActuatorVector {
    fn default() -> Self {
        Self {
            pwm: [PWM_IDLE; CHANNEL_COUNT],
        }
    }
}

impl ActuatorVector {
    /// Creates a vector with every channel at the idle pulse.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pulse for a channel.
    #[must_use]
    pub fn get(&self, channel: usize) -> f32 {
        self.pwm[channel]
    }

    /// Sets a channel pulse, clamped into the valid range.
    pub fn set(&mut self, channel: usize, pulse: f32) {
        self.pwm[channel] = pulse.clamp(PWM_MIN, PWM_MAX);
    }

    /// Steps a channel by a delta from its current pulse, clamped.
    pub fn adjust(&mut self, channel: usize, delta: f32) {
        self.set(channel, self.pwm[channel] + delta);
    }

    /// Drives every channel to the idle pulse.
    pub fn idle_all(&mut self) {
        self.pwm = [PWM_IDLE; CHANNEL_COUNT];
    }

    /// All channel pulses as integer microseconds.
    #[must_use]
    pub fn pulses(&self) -> [u16; CHANNEL_COUNT] {
        let mut out = [0u16; CHANNEL_COUNT];
        for (dst, &pwm) in out.iter_mut().zip(self.pwm.iter()) {
            *dst = pwm.round() as u16;
        }
        out
    }

    /// The first eight channels, as carried by the override message.
    #[must_use]
    pub fn override_pulses(&self) -> [u16; 8] {
        let mut out = [0u16; 8];
        for (dst, &pwm) in out.iter_mut().zip(self.pwm.iter()) {
            *dst = pwm.round() as u16;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Mapping Tests ====================

    #[test]
    fn test_neutral_maps_to_neutral_pulse() {
        let cal = ChannelCalibration::with_range(-180.0, 180.0, 0.0);
        assert_eq!(map_to_pulse(&cal, 0.0), PWM_IDLE);

        let cal = ChannelCalibration::with_range(-180.0, 180.0, 90.0);
        assert_eq!(map_to_pulse(&cal, 90.0), PWM_IDLE);
    }

    #[test]
    fn test_endpoints_map_to_pulse_limits() {
        let cal = ChannelCalibration::with_range(-1000.0, 1000.0, 0.0);
        assert_eq!(map_to_pulse(&cal, 1000.0), PWM_MAX);
        assert_eq!(map_to_pulse(&cal, -1000.0), PWM_MIN);
    }

    #[test]
    fn test_midpoint_interpolation() {
        let cal = ChannelCalibration::with_range(-1000.0, 1000.0, 0.0);
        assert_eq!(map_to_pulse(&cal, 500.0), 1700.0);
        assert_eq!(map_to_pulse(&cal, -500.0), 1300.0);
    }

    #[test]
    fn test_asymmetric_neutral() {
        // Heading-style calibration: neutral off-center
        let cal = ChannelCalibration::with_range(-180.0, 180.0, 90.0);
        assert_eq!(map_to_pulse(&cal, 180.0), PWM_MAX);
        assert_eq!(map_to_pulse(&cal, -180.0), PWM_MIN);
        // Halfway between min and neutral
        assert_eq!(map_to_pulse(&cal, -45.0), 1300.0);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let cal = ChannelCalibration::with_range(-1000.0, 1000.0, 0.0);
        assert_eq!(map_to_pulse(&cal, 5000.0), PWM_MAX);
        assert_eq!(map_to_pulse(&cal, -5000.0), PWM_MIN);
    }

    #[test]
    fn test_output_always_within_pulse_range() {
        let cal = ChannelCalibration::with_range(-180.0, 180.0, 0.0);
        let mut v = -2000.0f32;
        while v <= 2000.0 {
            let pulse = map_to_pulse(&cal, v);
            assert!((PWM_MIN..=PWM_MAX).contains(&pulse), "pulse {} for input {}", pulse, v);
            v += 7.3;
        }
    }

    #[test]
    fn test_reverse_mirrors_around_neutral() {
        let mut cal = ChannelCalibration::with_range(-1000.0, 1000.0, 0.0);
        cal.reverse = true;

        assert_eq!(map_to_pulse(&cal, 500.0), 1300.0);
        assert_eq!(map_to_pulse(&cal, -500.0), 1700.0);
        assert_eq!(map_to_pulse(&cal, 0.0), PWM_IDLE);
    }

    #[test]
    fn test_degenerate_span_returns_neutral() {
        let cal = ChannelCalibration::with_range(0.0, 0.0, 0.0);
        assert_eq!(map_to_pulse(&cal, 0.0), PWM_IDLE);
    }

    // ==================== ActuatorVector Tests ====================

    #[test]
    fn test_new_vector_is_idle() {
        let vec = ActuatorVector::new();
        for ch in 0..CHANNEL_COUNT {
            assert_eq!(vec.get(ch), PWM_IDLE);
        }
    }

    #[test]
    fn test_set_clamps() {
        let mut vec = ActuatorVector::new();
        vec.set(channels::FORWARD, 2500.0);
        assert_eq!(vec.get(channels::FORWARD), PWM_MAX);
        vec.set(channels::FORWARD, 100.0);
        assert_eq!(vec.get(channels::FORWARD), PWM_MIN);
    }

    #[test]
    fn test_adjust_steps_and_clamps() {
        let mut vec = ActuatorVector::new();
        vec.adjust(channels::CAMERA_TILT, 50.0);
        assert_eq!(vec.get(channels::CAMERA_TILT), 1550.0);

        for _ in 0..20 {
            vec.adjust(channels::CAMERA_TILT, 50.0);
        }
        assert_eq!(vec.get(channels::CAMERA_TILT), PWM_MAX);
    }

    #[test]
    fn test_idle_all_resets_every_channel() {
        let mut vec = ActuatorVector::new();
        vec.set(channels::FORWARD, 1800.0);
        vec.set(channels::LIGHTS_1, 1900.0);
        vec.idle_all();
        assert_eq!(vec.pulses(), [PWM_IDLE as u16; CHANNEL_COUNT]);
    }

    #[test]
    fn test_override_pulses_take_first_eight() {
        let mut vec = ActuatorVector::new();
        vec.set(channels::PITCH, 1600.0);
        vec.set(channels::LIGHTS_1, 1900.0); // channel 9, outside the override

        let pulses = vec.override_pulses();
        assert_eq!(pulses[channels::PITCH], 1600);
        assert_eq!(pulses.len(), 8);
    }
}
