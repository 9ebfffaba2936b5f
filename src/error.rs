//! Error types for `trafficsignal`
//!
//! The queue and controller never fail on their plain paths. Errors only
//! appear on the bounded (timeout) and cancellable paths, when the phase
//! loop dies, and while loading configuration. The CLI maps the last two
//! onto exit codes.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::phase::Phase;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `trafficsignal` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// The phase loop stopped unexpectedly
    pub const PHASE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `trafficsignal` operations.
#[derive(Debug, Error)]
pub enum TrafficSignalError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Phase controller error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrafficSignalError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Phase(_) => ExitCode::PHASE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Queue Errors
// ============================================================================

/// Errors from the bounded receive variants of [`BlockingQueue`].
///
/// The unbounded `receive` never fails; it has no error type.
///
/// [`BlockingQueue`]: crate::queue::BlockingQueue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No item arrived within the given duration
    #[error("no item received within {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// Phase Controller Errors
// ============================================================================

/// Errors from waiting on a [`PhaseController`].
///
/// [`PhaseController`]: crate::phase::PhaseController
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// The controller's cancellation token fired while waiting
    #[error("phase controller was shut down")]
    Cancelled,

    /// The target phase was not observed in time
    #[error("phase {target} not observed within {waited:?}")]
    Timeout {
        /// Phase the caller was waiting for
        target: Phase,
        /// How long the caller waited
        waited: Duration,
    },

    /// The background loop panicked or was aborted
    #[error("phase loop stopped unexpectedly")]
    LoopFailed,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `trafficsignal` operations.
pub type Result<T> = std::result::Result<T, TrafficSignalError>;

// ============================================================================
// Tests
// ============================================================================
