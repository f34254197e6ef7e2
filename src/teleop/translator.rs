//! # Action Translator Module
//!
//! The single place that turns one operator-intent event into updated
//! control state and a fresh actuator vector, and decides which mode and
//! arming commands go out with it.
//!
//! Per update, in order: gain adjustment, the six axis channels, camera
//! tilt, lights, trim, mode buttons, arm/disarm. The caller transmits the
//! actuator vector unconditionally afterwards, every cycle.

use tracing::{debug, info};

use super::actions::{ActionSet, AXIS_NAMES};
use super::channel::{
    channels, map_to_pulse, ActuatorVector, ChannelCalibration, CHANNEL_COUNT, PWM_IDLE,
};
use super::command::Command;
use crate::mavlink::protocol::sub_mode;

/// Highest gain multiplier
pub const GAIN_MAX: f32 = 1.0;
/// Lowest gain multiplier
pub const GAIN_MIN: f32 = 0.1;
/// Highest pitch/roll trim offset
pub const TRIM_MAX: f32 = 200.0;
/// Lowest pitch/roll trim offset
pub const TRIM_MIN: f32 = -200.0;
/// Trim change per button event
pub const TRIM_STEP: f32 = 10.0;

/// Mode buttons in priority order with their autopilot mode ids
const MODE_BUTTONS: [(&str, u32); 4] = [
    ("Stabilize", sub_mode::STABILIZE),
    ("DepthHold", sub_mode::DEPTH_HOLD),
    ("PositionHold", sub_mode::POS_HOLD),
    ("Manual", sub_mode::MANUAL),
];

/// Persistent gain/trim/step state
///
/// Mutated only by the translator (button events) and the parameter
/// handler (vehicle tuning replies); carries across update cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    /// Scalar applied to every axis input before mapping
    pub gain: f32,
    /// Vehicle-reported throttle gain (tracked, not applied locally)
    pub throttle_gain: f32,
    /// Pulse change per light button event
    pub light_step: f32,
    /// Pulse change per camera tilt button event
    pub camera_step: f32,
    /// Pitch trim offset (tracked, not yet folded into pulses)
    pub pitch_trim: f32,
    /// Roll trim offset (tracked, not yet folded into pulses)
    pub roll_trim: f32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            gain: 0.20,
            throttle_gain: 1.0,
            light_step: 100.0,
            camera_step: 50.0,
            pitch_trim: 0.0,
            roll_trim: 0.0,
        }
    }
}

/// Operator-intent -> actuator-channel translator
///
/// Owns the actuator vector and the control state; other components read
/// them only through accessors.
#[derive(Debug, Clone)]
pub struct ActionTranslator {
    calibration: [ChannelCalibration; CHANNEL_COUNT],
    control: ControlState,
    channels: ActuatorVector,
    /// Configured gain step in percent (2-10)
    gain_step: f32,
}

impl ActionTranslator {
    /// Creates a translator with the given per-channel calibration and
    /// configured gain step percentage.
    #[must_use]
    pub fn new(calibration: [ChannelCalibration; CHANNEL_COUNT], gain_step: u8) -> Self {
        Self {
            calibration,
            control: ControlState::default(),
            channels: ActuatorVector::new(),
            gain_step: f32::from(gain_step),
        }
    }

    /// Current actuator vector.
    #[must_use]
    pub fn channels(&self) -> &ActuatorVector {
        &self.channels
    }

    /// Current control state.
    #[must_use]
    pub fn control(&self) -> &ControlState {
        &self.control
    }

    /// Mutable control state, for the parameter-reply path.
    pub fn control_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }

    /// Configured gain step in percent.
    #[must_use]
    pub fn gain_step(&self) -> f32 {
        self.gain_step
    }

    /// Drives every channel to the idle pulse.
    ///
    /// The caller transmits afterwards, as with any update.
    pub fn idle(&mut self) {
        self.channels.idle_all();
    }

    /// Applies one operator-intent event.
    ///
    /// Updates the control state and recomputes the actuator vector, and
    /// returns the mode/arming commands the event requested, in order.
    /// No step can fail; the caller transmits the vector unconditionally
    /// after processing the returned commands.
    pub fn apply(&mut self, actions: &ActionSet) -> Vec<Command> {
        self.adjust_gain(actions);
        self.map_axes(actions);
        self.step_camera_tilt(actions);
        self.step_lights(actions);
        self.adjust_trim(actions);

        let mut commands = Vec::new();
        // Mode buttons: first match wins
        for (name, mode) in MODE_BUTTONS {
            if actions.button(name) {
                commands.push(Command::SetMode(mode));
                break;
            }
        }
        // Arm and disarm are deliberately not mutually exclusive
        if actions.button("Disarm") {
            commands.push(Command::Disarm);
        }
        if actions.button("Arm") {
            commands.push(Command::Arm);
        }
        commands
    }

    /// Gain step: GainUp wins when both flags are set.
    fn adjust_gain(&mut self, actions: &ActionSet) {
        if actions.button("GainUp") {
            self.control.gain = (self.control.gain + self.gain_step / 100.0).min(GAIN_MAX);
            info!("Gain is at {:.0} percent", self.control.gain * 100.0);
        } else if actions.button("GainDown") {
            self.control.gain = (self.control.gain - self.gain_step / 100.0).max(GAIN_MIN);
            info!("Gain is at {:.0} percent", self.control.gain * 100.0);
        }
    }

    /// Recomputes the six axis channels from this event's values.
    ///
    /// An axis with no value idles its channel; nothing is carried over
    /// from the previous cycle.
    fn map_axes(&mut self, actions: &ActionSet) {
        for (channel, name) in AXIS_NAMES.iter().enumerate() {
            match actions.axis(name) {
                Some(value) => {
                    let scaled = value * self.control.gain;
                    let cal = &mut self.calibration[channel];
                    cal.reverse = if is_reversible_axis(channel) {
                        false
                    } else {
                        scaled <= cal.val_neutral
                    };
                    self.channels.set(channel, map_to_pulse(cal, scaled));
                }
                None => {
                    self.calibration[channel].reverse = false;
                    self.channels.set(channel, PWM_IDLE);
                }
            }
        }
    }

    /// Camera tilt steps from the channel's current pulse; at most one of
    /// TiltUp/TiltDown/Center applies, in that priority order.
    fn step_camera_tilt(&mut self, actions: &ActionSet) {
        if actions.button("TiltUp") {
            self.channels.adjust(channels::CAMERA_TILT, self.control.camera_step);
        } else if actions.button("TiltDown") {
            self.channels.adjust(channels::CAMERA_TILT, -self.control.camera_step);
        } else if actions.button("Center") {
            self.channels.set(channels::CAMERA_TILT, PWM_IDLE);
        }
    }

    /// Both light banks always move together.
    fn step_lights(&mut self, actions: &ActionSet) {
        let delta = if actions.button("LightBrighter") {
            self.control.light_step
        } else if actions.button("LightDimmer") {
            -self.control.light_step
        } else {
            return;
        };
        self.channels.adjust(channels::LIGHTS_1, delta);
        self.channels
            .set(channels::LIGHTS_2, self.channels.get(channels::LIGHTS_1));
    }

    /// Trim values are tracked and clamped but not yet folded into the
    /// transmitted pulses.
    fn adjust_trim(&mut self, actions: &ActionSet) {
        if actions.button("PitchForward") {
            self.control.pitch_trim = (self.control.pitch_trim + TRIM_STEP).min(TRIM_MAX);
        }
        if actions.button("PitchBackward") {
            self.control.pitch_trim = (self.control.pitch_trim - TRIM_STEP).max(TRIM_MIN);
        }
        if actions.button("RollRight") {
            self.control.roll_trim = (self.control.roll_trim + TRIM_STEP).min(TRIM_MAX);
        }
        if actions.button("RollLeft") {
            self.control.roll_trim = (self.control.roll_trim - TRIM_STEP).max(TRIM_MIN);
        }
        debug!(
            pitch_trim = self.control.pitch_trim,
            roll_trim = self.control.roll_trim,
            "trim state"
        );
    }
}

/// Axes whose channel never uses the reverse flag
fn is_reversible_axis(channel: usize) -> bool {
    matches!(
        channel,
        channels::FORWARD | channels::LATERAL | channels::THROTTLE | channels::HEADING
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teleop::channel::{PWM_MAX, PWM_MIN};

    fn translator() -> ActionTranslator {
        ActionTranslator::new([ChannelCalibration::default(); CHANNEL_COUNT], 10)
    }

    fn buttons(names: &[&str]) -> ActionSet {
        let mut actions = ActionSet::new();
        for name in names {
            actions.set(name, 1.0);
        }
        actions
    }

    // ==================== Gain Tests ====================

    #[test]
    fn test_gain_up_sequence_then_clamp() {
        let mut tr = translator();
        let press = buttons(&["GainUp"]);

        for expected in [0.30f32, 0.40, 0.50] {
            tr.apply(&press);
            assert!((tr.control().gain - expected).abs() < 1e-6);
        }
        for _ in 0..6 {
            tr.apply(&press);
        }
        assert!((tr.control().gain - GAIN_MAX).abs() < 1e-6, "gain clamps at max");
    }

    #[test]
    fn test_gain_down_clamps_at_min() {
        let mut tr = translator();
        let press = buttons(&["GainDown"]);
        for _ in 0..10 {
            tr.apply(&press);
        }
        assert!((tr.control().gain - GAIN_MIN).abs() < 1e-6);
    }

    #[test]
    fn test_gain_up_wins_over_gain_down() {
        let mut tr = translator();
        tr.apply(&buttons(&["GainUp", "GainDown"]));
        assert!((tr.control().gain - 0.30).abs() < 1e-6);
    }

    #[test]
    fn test_gain_stays_bounded_for_any_sequence() {
        let mut tr = translator();
        let up = buttons(&["GainUp"]);
        let down = buttons(&["GainDown"]);
        for i in 0..50 {
            tr.apply(if i % 3 == 0 { &down } else { &up });
            let gain = tr.control().gain;
            assert!((GAIN_MIN..=GAIN_MAX).contains(&gain), "gain {} out of range", gain);
        }
    }

    // ==================== Axis Tests ====================

    #[test]
    fn test_axis_value_scaled_by_gain() {
        let mut tr = translator();
        let mut actions = ActionSet::new();
        actions.set("Forward", 1000.0);
        tr.apply(&actions);

        // 1000 * 0.20 gain = 200 -> 1500 + 200/1000 * 400 = 1580
        assert_eq!(tr.channels().get(channels::FORWARD), 1580.0);
    }

    #[test]
    fn test_missing_axis_idles_channel() {
        let mut tr = translator();
        let mut actions = ActionSet::new();
        actions.set("Forward", 1000.0);
        tr.apply(&actions);
        assert_ne!(tr.channels().get(channels::FORWARD), PWM_IDLE);

        tr.apply(&ActionSet::new());
        assert_eq!(
            tr.channels().get(channels::FORWARD),
            PWM_IDLE,
            "stale axis value must not persist"
        );
    }

    #[test]
    fn test_non_reversible_axis_sets_reverse_below_neutral() {
        let mut tr = translator();
        let mut actions = ActionSet::new();
        actions.set("Pitch", -500.0);
        tr.apply(&actions);

        // -500 * 0.20 = -100; reversed mapping mirrors it above neutral
        assert_eq!(tr.channels().get(channels::PITCH), 1540.0);
    }

    #[test]
    fn test_reversible_axis_never_reverses() {
        let mut tr = translator();
        let mut actions = ActionSet::new();
        actions.set("Heading", -500.0);
        tr.apply(&actions);

        // -500 * 0.20 = -100 -> 1500 - 100/1000 * 400 = 1460
        assert_eq!(tr.channels().get(channels::HEADING), 1460.0);
    }

    #[test]
    fn test_all_axes_absent_all_axis_channels_idle() {
        let mut tr = translator();
        tr.apply(&buttons(&["GainUp"]));
        for channel in 0..6 {
            assert_eq!(tr.channels().get(channel), PWM_IDLE);
        }
    }

    // ==================== Camera Tilt Tests ====================

    #[test]
    fn test_tilt_steps_from_current_value() {
        let mut tr = translator();
        tr.apply(&buttons(&["TiltUp"]));
        assert_eq!(tr.channels().get(channels::CAMERA_TILT), 1550.0);

        tr.apply(&buttons(&["TiltUp"]));
        tr.apply(&buttons(&["TiltDown"]));
        assert_eq!(tr.channels().get(channels::CAMERA_TILT), 1550.0, "net one step up");
    }

    #[test]
    fn test_tilt_clamps_at_max() {
        let mut tr = translator();
        for _ in 0..20 {
            tr.apply(&buttons(&["TiltUp"]));
        }
        assert_eq!(tr.channels().get(channels::CAMERA_TILT), PWM_MAX);
    }

    #[test]
    fn test_tilt_priority_up_beats_down_and_center() {
        let mut tr = translator();
        tr.apply(&buttons(&["TiltUp", "TiltDown", "Center"]));
        assert_eq!(tr.channels().get(channels::CAMERA_TILT), 1550.0);
    }

    #[test]
    fn test_center_forces_idle() {
        let mut tr = translator();
        tr.apply(&buttons(&["TiltUp"]));
        tr.apply(&buttons(&["TiltUp"]));
        tr.apply(&buttons(&["Center"]));
        assert_eq!(tr.channels().get(channels::CAMERA_TILT), PWM_IDLE);
    }

    // ==================== Light Tests ====================

    #[test]
    fn test_lights_move_together() {
        let mut tr = translator();
        tr.apply(&buttons(&["LightBrighter"]));
        assert_eq!(tr.channels().get(channels::LIGHTS_1), 1600.0);
        assert_eq!(tr.channels().get(channels::LIGHTS_2), 1600.0);

        tr.apply(&buttons(&["LightDimmer"]));
        assert_eq!(tr.channels().get(channels::LIGHTS_1), 1500.0);
        assert_eq!(tr.channels().get(channels::LIGHTS_2), 1500.0);
    }

    #[test]
    fn test_lights_clamp_at_limits() {
        let mut tr = translator();
        for _ in 0..10 {
            tr.apply(&buttons(&["LightBrighter"]));
        }
        assert_eq!(tr.channels().get(channels::LIGHTS_1), PWM_MAX);

        for _ in 0..20 {
            tr.apply(&buttons(&["LightDimmer"]));
        }
        assert_eq!(tr.channels().get(channels::LIGHTS_2), PWM_MIN);
    }

    // ==================== Trim Tests ====================

    #[test]
    fn test_trim_steps_and_clamps() {
        let mut tr = translator();
        tr.apply(&buttons(&["PitchForward"]));
        assert_eq!(tr.control().pitch_trim, 10.0);

        for _ in 0..30 {
            tr.apply(&buttons(&["PitchForward"]));
        }
        assert_eq!(tr.control().pitch_trim, TRIM_MAX);

        for _ in 0..50 {
            tr.apply(&buttons(&["RollLeft"]));
        }
        assert_eq!(tr.control().roll_trim, TRIM_MIN);
    }

    #[test]
    fn test_trim_never_reaches_transmitted_pulses() {
        let mut tr = translator();
        for _ in 0..5 {
            tr.apply(&buttons(&["PitchForward", "RollRight"]));
        }
        // Trim accumulates but the pitch/roll channels stay idle
        assert_eq!(tr.control().pitch_trim, 50.0);
        assert_eq!(tr.channels().get(channels::PITCH), PWM_IDLE);
        assert_eq!(tr.channels().get(channels::ROLL), PWM_IDLE);
    }

    #[test]
    fn test_trim_stays_bounded_for_any_sequence() {
        let mut tr = translator();
        for i in 0..100 {
            let name = match i % 4 {
                0 => "PitchForward",
                1 => "PitchBackward",
                2 => "RollLeft",
                _ => "RollRight",
            };
            tr.apply(&buttons(&[name, "PitchForward"]));
            let c = tr.control();
            assert!((TRIM_MIN..=TRIM_MAX).contains(&c.pitch_trim));
            assert!((TRIM_MIN..=TRIM_MAX).contains(&c.roll_trim));
        }
    }

    // ==================== Mode and Arming Tests ====================

    #[test]
    fn test_mode_buttons_first_match_wins() {
        let mut tr = translator();
        let commands = tr.apply(&buttons(&["Manual", "DepthHold"]));
        assert_eq!(commands, vec![Command::SetMode(sub_mode::DEPTH_HOLD)]);
    }

    #[test]
    fn test_each_mode_button() {
        for (name, mode) in MODE_BUTTONS {
            let mut tr = translator();
            let commands = tr.apply(&buttons(&[name]));
            assert_eq!(commands, vec![Command::SetMode(mode)]);
        }
    }

    #[test]
    fn test_arm_and_disarm_both_fire() {
        let mut tr = translator();
        let commands = tr.apply(&buttons(&["Arm", "Disarm"]));
        assert_eq!(commands, vec![Command::Disarm, Command::Arm]);
    }

    #[test]
    fn test_plain_axis_event_produces_no_commands() {
        let mut tr = translator();
        let mut actions = ActionSet::new();
        actions.set("Forward", 200.0);
        assert!(tr.apply(&actions).is_empty());
    }

    // ==================== Idle Tests ====================

    #[test]
    fn test_idle_resets_all_eleven_channels() {
        let mut tr = translator();
        let mut actions = ActionSet::new();
        actions.set("Forward", 800.0);
        actions.set("TiltUp", 1.0);
        actions.set("LightBrighter", 1.0);
        tr.apply(&actions);

        tr.idle();
        assert_eq!(tr.channels().pulses(), [PWM_IDLE as u16; CHANNEL_COUNT]);
    }

    #[test]
    fn test_control_state_survives_idle() {
        let mut tr = translator();
        tr.apply(&buttons(&["GainUp", "PitchForward"]));
        tr.idle();
        assert!((tr.control().gain - 0.30).abs() < 1e-6);
        assert_eq!(tr.control().pitch_trim, 10.0);
    }
}
