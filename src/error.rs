//! # Error Types
//!
//! Custom error types for ROV Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for ROV Bridge
#[derive(Debug, Error)]
pub enum RovBridgeError {
    /// MAVLink protocol errors
    #[error("MAVLink protocol error: {0}")]
    MavlinkProtocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ROV Bridge
pub type Result<T> = std::result::Result<T, RovBridgeError>;
