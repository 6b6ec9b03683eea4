//! Unified error type hierarchy for JitterMark
//!
//! Provides structured error handling with ConfigError for the harness
//! configuration layer and JitterError for everything else.

use std::io;
use thiserror::Error;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type for all JitterMark modules.
///
/// The record path never produces one of these; it reports precondition
/// violations through a boolean return instead.
#[derive(Error, Debug)]
pub enum JitterError {
    /// Zero bin width, zero bin count, or a geometry that cannot be represented
    #[error("Invalid histogram geometry: {0}")]
    InvalidGeometry(String),

    /// A run was used before `begin_run`
    #[error("Measurement run not configured")]
    NotConfigured,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Audio sink or synthesizer failure
    #[error("Audio error: {0}")]
    Audio(String),

    /// Real-time environment preparation failed
    #[error("Real-time setup failed: {0}")]
    Realtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl JitterError {
    /// Get a user-facing error message suitable for the command line
    pub fn user_message(&self) -> String {
        match self {
            JitterError::InvalidGeometry(msg) => format!("Histogram setup rejected: {}", msg),
            JitterError::NotConfigured => {
                "Measurement was started before the histograms were configured".to_string()
            }
            JitterError::Config(err) => format!("Could not load configuration: {}", err),
            JitterError::Audio(msg) => format!("Audio pipeline failed: {}", msg),
            JitterError::Realtime(msg) => format!("Real-time setup failed: {}", msg),
            JitterError::Io(err) => format!("File operation failed: {}", err),
        }
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, JitterError>;
