//! Error types for mdtask
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (unknown task, invalid input, bad config)
//! - 3: Blocked (duplicate, permission, conflict)
//! - 4: Operation failed (I/O, serialization)

use thiserror::Error;

use crate::markdown::FrontMatterError;

/// Exit codes for the mdtask CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Coarse error category shared by every error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Internal,
    Duplicate,
    Permission,
    Conflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Internal => "internal",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Permission => "permission",
            ErrorKind::Conflict => "conflict",
        }
    }
}

/// Main error type for mdtask operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Reserved categories (exit code 3)
    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("Permission denied: cannot {action} {resource}")]
    Permission { action: String, resource: String },

    #[error("Conflict with {resource}: {message}")]
    Conflict { resource: String, message: String },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Front matter error: {0}")]
    FrontMatter(#[from] FrontMatterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "task",
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidInput(_) | Error::InvalidConfig(_) => ErrorKind::InvalidInput,
            Error::Duplicate { .. } => ErrorKind::Duplicate,
            Error::Permission { .. } => ErrorKind::Permission,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Io(_)
            | Error::Walk(_)
            | Error::FrontMatter(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => ErrorKind::Internal,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::InvalidInput => exit_codes::USER_ERROR,
            ErrorKind::Duplicate | ErrorKind::Permission | ErrorKind::Conflict => {
                exit_codes::BLOCKED
            }
            ErrorKind::Internal => exit_codes::OPERATION_FAILED,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }
}

/// Result type alias for mdtask operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind().as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_user_error() {
        let err = Error::task_not_found("task/20240101120000");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(err.to_string(), "task not found: task/20240101120000");
    }

    #[test]
    fn io_errors_are_internal() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);
    }

    #[test]
    fn reserved_kinds_map_to_blocked() {
        let err = Error::Conflict {
            resource: "task/1".to_string(),
            message: "modified on disk".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.exit_code(), exit_codes::BLOCKED);
    }

    #[test]
    fn json_error_carries_kind() {
        let err = Error::InvalidInput("title cannot be empty".to_string());
        let json = JsonError::from(&err);
        assert_eq!(json.kind, "invalid_input");
        assert_eq!(json.code, 2);
    }
}
