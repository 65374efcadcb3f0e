//! Error types for the scheduling engine
//!
//! Most unresolvable input is tolerated silently (unknown ids, dangling
//! dependencies). The variants here are the conditions the engine refuses:
//! - Fatal: a dependency cycle, which would keep propagation from terminating
//! - Input: bad date ranges, out-of-range scores, blocked tasks without a reason
//! - Environment: config and plan file I/O

use chrono::NaiveDateTime;
use thiserror::Error;

/// Error types for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    // Fatal
    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    // Input errors
    #[error("Invalid date range for task {task_id}: end {end} is before start {start}")]
    InvalidDateRange {
        task_id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Task {0} is blocked but has no blocked reason")]
    MissingBlockedReason(String),

    #[error("Task {task_id}: {field} must be between 1 and 5, got {value}")]
    OutOfRange {
        task_id: String,
        field: &'static str,
        value: u8,
    },

    // Environment errors
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl EngineError {
    /// Returns true if the operation cannot complete on this input at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::CycleDetected(_))
    }

    /// Short machine-readable kind, used in serialized payloads
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::CycleDetected(_) => "cycle_detected",
            EngineError::InvalidDateRange { .. } => "invalid_date_range",
            EngineError::MissingBlockedReason(_) => "missing_blocked_reason",
            EngineError::OutOfRange { .. } => "out_of_range",
            EngineError::ConfigurationError(_) => "configuration",
            EngineError::ParseError(_) => "parse",
            EngineError::IoError(_) => "io",
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::CycleDetected(_) => {
                "Remove one of the dependencies listed in the cycle and try again."
            }
            EngineError::InvalidDateRange { .. } => "Pick an end date on or after the start date.",
            EngineError::MissingBlockedReason(_) => "Say why the task is blocked.",
            EngineError::OutOfRange { .. } => "Use a score from 1 to 5.",
            EngineError::ConfigurationError(_) => "Check your configuration in ~/.dayplan/config.json",
            EngineError::ParseError(_) => "Check the file format is correct.",
            EngineError::IoError(_) => "Check file permissions and disk space.",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ParseError(err.to_string())
    }
}

/// Serializable error representation for CLI output
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineErrorPayload {
    pub message: String,
    pub error_kind: &'static str,
    pub fatal: bool,
    pub recovery_suggestion: String,
}

impl From<&EngineError> for EngineErrorPayload {
    fn from(err: &EngineError) -> Self {
        EngineErrorPayload {
            message: err.to_string(),
            error_kind: err.kind(),
            fatal: err.is_fatal(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
