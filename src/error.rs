//! Error types for cotask
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid config)
//! - 4: Operation failed (I/O, serialization, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the cotask CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for cotask operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task {0} is already completed")]
    AlreadyCompleted(u64),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidConfig(_) | Error::AlreadyCompleted(_) => {
                exit_codes::USER_ERROR
            }

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for cotask operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_exit_code_2() {
        assert_eq!(
            Error::InvalidArgument("empty".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(Error::AlreadyCompleted(7).exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn operation_failures_map_to_exit_code_4() {
        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.exit_code(), exit_codes::OPERATION_FAILED);
        assert_eq!(
            Error::LockFailed(PathBuf::from("/tmp/x.lock")).exit_code(),
            exit_codes::OPERATION_FAILED
        );
    }
}
