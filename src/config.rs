//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::Result;
use crate::teleop::channel::{ChannelCalibration, CHANNEL_COUNT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub axes: AxesConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Vehicle link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Autopilot address, possibly a MAVProxy endpoint
    #[serde(default = "default_remote_addr")]
    pub remote_addr: String,

    /// Autopilot command port
    #[serde(default = "default_remote_port")]
    pub remote_port: u16,

    /// Local TCP bind port for the command stream
    #[serde(default = "default_command_port")]
    pub command_port: u16,

    /// Local UDP bind port for telemetry
    #[serde(default = "default_telemetry_port")]
    pub telemetry_port: u16,

    /// Inbound poll timeout per drain iteration
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Backoff before a reconnect attempt
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Control and identity configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    /// Gain step increment and decrement, in percent (2-10)
    #[serde(default = "default_gain_step")]
    pub gain_step: u8,

    /// This bridge's MAVLink system id
    #[serde(default = "default_local_system_id")]
    pub local_system_id: u8,

    /// The vehicle's MAVLink system id
    #[serde(default = "default_vehicle_system_id")]
    pub vehicle_system_id: u8,
}

/// Normalized input range for one control axis
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
    pub neutral: f32,
}

/// Normalized input ranges for the six control axes
#[derive(Debug, Deserialize, Clone)]
pub struct AxesConfig {
    #[serde(default = "default_angle_axis")]
    pub pitch: AxisRange,

    #[serde(default = "default_angle_axis")]
    pub roll: AxisRange,

    #[serde(default = "default_linear_axis")]
    pub throttle: AxisRange,

    #[serde(default = "default_heading_axis")]
    pub heading: AxisRange,

    #[serde(default = "default_linear_axis")]
    pub forward: AxisRange,

    #[serde(default = "default_linear_axis")]
    pub lateral: AxisRange,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Log file directory; empty logs to stdout only
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_remote_addr() -> String { "127.0.0.1".to_string() }
fn default_remote_port() -> u16 { 5760 }
fn default_command_port() -> u16 { 5770 }
fn default_telemetry_port() -> u16 { 14551 }
fn default_poll_timeout_ms() -> u64 { 10 }
fn default_reconnect_interval_ms() -> u64 { 500 }

fn default_gain_step() -> u8 { 10 }
fn default_local_system_id() -> u8 { 254 }
fn default_vehicle_system_id() -> u8 { 1 }

fn default_angle_axis() -> AxisRange {
    AxisRange { min: -180.0, max: 180.0, neutral: 0.0 }
}
fn default_heading_axis() -> AxisRange {
    AxisRange { min: -180.0, max: 180.0, neutral: 90.0 }
}
fn default_linear_axis() -> AxisRange {
    AxisRange { min: -1000.0, max: 1000.0, neutral: 0.0 }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            remote_addr: default_remote_addr(),
            remote_port: default_remote_port(),
            command_port: default_command_port(),
            telemetry_port: default_telemetry_port(),
            poll_timeout_ms: default_poll_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            gain_step: default_gain_step(),
            local_system_id: default_local_system_id(),
            vehicle_system_id: default_vehicle_system_id(),
        }
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            pitch: default_angle_axis(),
            roll: default_angle_axis(),
            throttle: default_linear_axis(),
            heading: default_heading_axis(),
            forward: default_linear_axis(),
            lateral: default_linear_axis(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: String::new() }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.link.remote_addr.is_empty() {
            return Err(crate::error::RovBridgeError::Config(
                toml::de::Error::custom("remote_addr cannot be empty")
            ));
        }

        if self.remote_endpoint().is_err() {
            return Err(crate::error::RovBridgeError::Config(
                toml::de::Error::custom("remote_addr must be an IP address")
            ));
        }

        if self.link.poll_timeout_ms == 0 || self.link.poll_timeout_ms > 10000 {
            return Err(crate::error::RovBridgeError::Config(
                toml::de::Error::custom("poll_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.link.reconnect_interval_ms == 0 || self.link.reconnect_interval_ms > 60000 {
            return Err(crate::error::RovBridgeError::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        if !(2..=10).contains(&self.control.gain_step) {
            return Err(crate::error::RovBridgeError::Config(
                toml::de::Error::custom("gain_step must be between 2 and 10")
            ));
        }

        for (name, axis) in [
            ("pitch", self.axes.pitch),
            ("roll", self.axes.roll),
            ("throttle", self.axes.throttle),
            ("heading", self.axes.heading),
            ("forward", self.axes.forward),
            ("lateral", self.axes.lateral),
        ] {
            if axis.min >= axis.max {
                return Err(crate::error::RovBridgeError::Config(
                    toml::de::Error::custom(format!("axis {}: min must be less than max", name))
                ));
            }
            if axis.neutral < axis.min || axis.neutral > axis.max {
                return Err(crate::error::RovBridgeError::Config(
                    toml::de::Error::custom(format!("axis {}: neutral must lie within [min, max]", name))
                ));
            }
        }

        Ok(())
    }

    /// The autopilot command endpoint as a socket address.
    ///
    /// # Errors
    ///
    /// Returns error if `remote_addr` does not parse as an IP address.
    pub fn remote_endpoint(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.link.remote_addr, self.link.remote_port)
            .parse()
            .map_err(|_| {
                crate::error::RovBridgeError::Config(toml::de::Error::custom(format!(
                    "invalid remote address: {}",
                    self.link.remote_addr
                )))
            })
    }

    /// Builds the per-channel calibration table.
    ///
    /// The six control axes take their configured normalized ranges; the
    /// camera, light and video channels keep the default calibration (they
    /// are stepped directly in pulse space, never mapped).
    #[must_use]
    pub fn calibrations(&self) -> [ChannelCalibration; CHANNEL_COUNT] {
        let axis = |range: AxisRange| ChannelCalibration::with_range(range.min, range.max, range.neutral);

        let mut table = [ChannelCalibration::default(); CHANNEL_COUNT];
        table[0] = axis(self.axes.pitch);
        table[1] = axis(self.axes.roll);
        table[2] = axis(self.axes.throttle);
        table[3] = axis(self.axes.heading);
        table[4] = axis(self.axes.forward);
        table[5] = axis(self.axes.lateral);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.link.remote_addr, "127.0.0.1");
        assert_eq!(config.link.remote_port, 5760);
        assert_eq!(config.control.gain_step, 10);
        assert_eq!(config.control.local_system_id, 254);
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.link.telemetry_port, 14551);
        assert_eq!(config.axes.heading.neutral, 90.0);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [control]
            gain_step = 5

            [axes.forward]
            min = -500.0
            max = 500.0
            neutral = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.control.gain_step, 5);
        assert_eq!(config.axes.forward.max, 500.0);
        // Untouched sections keep defaults
        assert_eq!(config.axes.pitch.max, 180.0);
        assert_eq!(config.link.remote_port, 5760);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[link]\nremote_addr = \"192.168.2.1\"\nremote_port = 5777"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.link.remote_addr, "192.168.2.1");
        assert_eq!(config.link.remote_port, 5777);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load("/nonexistent/rov-bridge.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_gain_step() {
        let mut config = Config::default();
        config.control.gain_step = 1;
        assert!(config.validate().is_err());

        config.control.gain_step = 11;
        assert!(config.validate().is_err());

        config.control.gain_step = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_axis_range() {
        let mut config = Config::default();
        config.axes.pitch.min = 200.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.axes.heading.neutral = 400.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_address() {
        let mut config = Config::default();
        config.link.remote_addr = "not-an-ip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_poll_timeout() {
        let mut config = Config::default();
        config.link.poll_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_endpoint() {
        let config = Config::default();
        let endpoint = config.remote_endpoint().unwrap();
        assert_eq!(endpoint.port(), 5760);
    }

    #[test]
    fn test_calibrations_apply_axis_ranges() {
        let config = Config::default();
        let table = config.calibrations();

        assert_eq!(table[0].val_max, 180.0); // pitch
        assert_eq!(table[3].val_neutral, 90.0); // heading
        assert_eq!(table[4].val_max, 1000.0); // forward
        // Camera tilt keeps the default range
        assert_eq!(table[7].val_max, 1000.0);
    }
}
