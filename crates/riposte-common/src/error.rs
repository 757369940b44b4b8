//! Error types for Riposte.
//!
//! The simulation itself has no failure modes; errors only exist at the
//! configuration boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating character configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse errors from any supported format
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        /// Format name ("toml", "ron")
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// File extension not recognised
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Parallel attack tables have different lengths
    #[error("Attack tables disagree: {hit_times} hit times, {recover_times} recover times, {damages} damages")]
    AttackTableMismatch {
        /// Number of hit times
        hit_times: usize,
        /// Number of recover times
        recover_times: usize,
        /// Number of damages
        damages: usize,
    },

    /// A value is outside its valid range
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
