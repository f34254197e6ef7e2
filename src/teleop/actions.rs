//! # Operator Intent Module
//!
//! Events delivered by the operator-command source: a flattened
//! name -> numeric map of axis values and button flags, plus session
//! start/stop markers.
//!
//! ## Well-Known Keys
//!
//! Axes: `Pitch, Roll, Throttle, Heading, Forward, Lateral`.
//!
//! Buttons: `GainUp, GainDown, TiltUp, TiltDown, Center, LightDimmer,
//! LightBrighter, PitchForward, PitchBackward, RollLeft, RollRight,
//! Stabilize, DepthHold, PositionHold, Manual, Arm, Disarm`.
//!
//! A missing axis key means "no value" (the channel idles); a missing
//! button key reads as not pressed.

use std::collections::HashMap;

/// Axis names in channel order
pub const AXIS_NAMES: [&str; 6] = ["Pitch", "Roll", "Throttle", "Heading", "Forward", "Lateral"];

/// One operator-intent event
///
/// Parsed from the bus tuple format `Key=Value;Key=Value`.
///
/// # Examples
///
/// ```
/// use rov_bridge::teleop::actions::ActionSet;
///
/// let actions = ActionSet::parse("Forward=0.5;GainUp=1");
/// assert_eq!(actions.axis("Forward"), Some(0.5));
/// assert!(actions.button("GainUp"));
/// assert!(actions.axis("Pitch").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionSet {
    values: HashMap<String, f32>,
}

impl ActionSet {
    /// Creates an empty event (all axes absent, all buttons released).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `Key=Value;Key=Value` tuple list.
    ///
    /// Entries with a missing or unparseable value are skipped; an empty
    /// or whitespace input yields an empty event.
    #[must_use]
    pub fn parse(tuples: &str) -> Self {
        let mut values = HashMap::new();
        for entry in tuples.split(';') {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            if let Ok(value) = value.trim().parse::<f32>() {
                values.insert(key.trim().to_owned(), value);
            }
        }
        Self { values }
    }

    /// Sets one entry, replacing any previous value.
    pub fn set(&mut self, key: &str, value: f32) -> &mut Self {
        self.values.insert(key.to_owned(), value);
        self
    }

    /// Axis reading, if the event carries one.
    ///
    /// A non-finite value is the "no value" sentinel and reads as absent.
    #[must_use]
    pub fn axis(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied().filter(|v| v.is_finite())
    }

    /// Button flag; absent keys read as released.
    #[must_use]
    pub fn button(&self, name: &str) -> bool {
        self.values.get(name).map_or(false, |&v| v as i32 == 1)
    }

    /// True when the event carries no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Events the bridge consumes from the operator-command source
#[derive(Debug, Clone, PartialEq)]
pub enum TeleopEvent {
    /// Begin a teleoperation session; carries an opaque originator id
    Start { originator: String },
    /// End the current teleoperation session
    Stop,
    /// One cycle of axis values and button flags
    Actions(ActionSet),
}
