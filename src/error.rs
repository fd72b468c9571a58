//! Error types for trialflow.
//!
//! Domain-specific error enums plus a top-level error that maps each
//! failure class to a Unix exit code for the CLI.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for trialflow CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Sequencer error (protocol violation, invalid goto target)
    pub const SEQUENCE_ERROR: i32 = 5;

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

/// Top-level error type for trialflow operations.
///
/// Aggregates the domain-specific errors and provides a unified
/// interface for error handling and exit code mapping.
#[derive(Debug, Error)]
pub enum TrialflowError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sequencer protocol or state machine error
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrialflowError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Sequence(_) => ExitCode::SEQUENCE_ERROR,
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
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
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

    /// Phase kind tag has no registered builder
    #[error("unknown phase kind '{kind}' at {location}")]
    UnknownPhaseKind {
        /// The unrecognized kind tag
        kind: String,
        /// Location in the configuration (e.g. "blocks[0].trials[1].phases[2]")
        location: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g. "blocks[0].trials[2].repetitions")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Sequencer Errors
// ============================================================================

/// Sequencer state machine and protocol errors.
///
/// Protocol violations are reported to the caller so tests and drivers can
/// observe them, but the sequencer leaves its state unchanged — the driver
/// absorbs the error and the run degrades rather than crashing.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// A completion was reported by a stage that is not the current one
    #[error("protocol violation: {context} (expected {expected}, got {got})")]
    ProtocolViolation {
        /// What was being attempted
        context: String,
        /// Index of the stage the protocol expected
        expected: usize,
        /// Index that was actually reported
        got: usize,
    },

    /// A goto targeted a phase outside the trial's sequence
    #[error("invalid goto target: phase index {index} out of range (trial has {count} phases)")]
    InvalidTarget {
        /// The requested phase index
        index: usize,
        /// Number of phases in the trial
        count: usize,
    },

    /// The trial has no usable phases and cannot be started
    #[error("trial '{trial}' has no usable phases")]
    EmptyTrial {
        /// Name of the orphaned trial
        trial: String,
    },

    /// An operation required a started trial
    #[error("trial '{trial}' has not been started")]
    NotStarted {
        /// Name of the trial
        trial: String,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for trialflow operations.
pub type Result<T> = std::result::Result<T, TrialflowError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SEQUENCE_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_sequence_error_exit_code() {
        let err: TrialflowError = SequenceError::InvalidTarget { index: 9, count: 3 }.into();
        assert_eq!(err.exit_code(), ExitCode::SEQUENCE_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: TrialflowError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: TrialflowError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "blocks[0].trials[2].repetitions".to_string(),
            message: "repetitions must be >= 1".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(
            issue.to_string(),
            "warning: repetitions must be >= 1 at blocks[0].trials[2].repetitions"
        );
    }

    #[test]
    fn test_protocol_violation_display() {
        let err = SequenceError::ProtocolViolation {
            context: "phase completion".to_string(),
            expected: 1,
            got: 2,
        };
        assert!(err.to_string().contains("expected 1"));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_unknown_phase_kind_display() {
        let err = ConfigError::UnknownPhaseKind {
            kind: "mystery".to_string(),
            location: "blocks[0].trials[0].phases[1]".to_string(),
        };
        assert!(err.to_string().contains("mystery"));
        assert!(err.to_string().contains("phases[1]"));
    }
}
