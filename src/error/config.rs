// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 4001-4004
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Config file could not be read
    pub const IO: i32 = 4001;

    /// Config or voice JSON did not parse
    pub const PARSE: i32 = 4002;

    /// Scale preset name not recognised
    pub const UNKNOWN_SCALE: i32 = 4003;

    /// Voice preset part or index not recognised
    pub const UNKNOWN_PRESET: i32 = 4004;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=Config, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration-related errors
///
/// Out-of-range numeric values are never errors; they are clamped on the way
/// in. These variants cover input that cannot be interpreted at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Reading the config source failed
    Io { details: String },

    /// JSON payload was malformed
    Parse { details: String },

    /// Unknown scale preset name
    UnknownScale { name: String },

    /// Unknown voice preset part or state index
    UnknownPreset { part: String, index: usize },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
            ConfigError::UnknownScale { .. } => ConfigErrorCodes::UNKNOWN_SCALE,
            ConfigError::UnknownPreset { .. } => ConfigErrorCodes::UNKNOWN_PRESET,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Io { details } => format!("Failed to read config: {}", details),
            ConfigError::Parse { details } => format!("Failed to parse config: {}", details),
            ConfigError::UnknownScale { name } => {
                format!("Unknown scale preset '{}' (expected ambient, major or minor)", name)
            }
            ConfigError::UnknownPreset { part, index } => {
                format!("No voice preset {} for part '{}'", index, part)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io {
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse {
            details: err.to_string(),
        }
    }
}
