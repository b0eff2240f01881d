//! # CLI Error Type
//!
//! Unified error type for commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Presensi CLI                       │
//! │                                                                         │
//! │  Command ─► CliResult<T>                                               │
//! │                 │                                                       │
//! │                 ├── SyncError  (network, HTTP, geofence, session)      │
//! │                 ├── DbError    (SQLite)                                │
//! │                 ├── ValidationError (bad input before any request)     │
//! │                 └── InvalidArgument (command line)                     │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  main.rs ─► ErrorReport {code, message} ─► stderr (text or JSON)       │
//! │          ─► exit status from ErrorCode                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use presensi_core::ValidationError;
use presensi_db::DbError;
use presensi_sync::SyncError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

/// Machine-readable error codes for `--json` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad command line or input rejected locally
    InvalidInput,

    /// No session, or the session expired
    NotAuthenticated,

    /// Could not reach the backend
    Offline,

    /// The backend refused the request
    Rejected,

    /// Outside the office geofence (the action was queued)
    OutsideGeofence,

    /// Already recorded for today
    AlreadyRecorded,

    /// Local storage failed
    DatabaseError,

    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_status(self) -> u8 {
        match self {
            ErrorCode::InvalidInput => 2,
            ErrorCode::NotAuthenticated => 3,
            ErrorCode::Offline => 4,
            ErrorCode::Rejected | ErrorCode::AlreadyRecorded => 5,
            ErrorCode::OutsideGeofence => 6,
            ErrorCode::DatabaseError | ErrorCode::Internal => 1,
        }
    }
}

impl CliError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CliError::Sync(e) => match e {
                SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::InvalidInput(_)
                | SyncError::Validation { .. } => ErrorCode::InvalidInput,
                SyncError::NotAuthenticated => ErrorCode::NotAuthenticated,
                SyncError::Http { status: 401, .. } => ErrorCode::NotAuthenticated,
                SyncError::Network(_) | SyncError::Timeout(_) => ErrorCode::Offline,
                SyncError::Http { .. } | SyncError::Rejected { .. } => ErrorCode::Rejected,
                SyncError::OutsideGeofence { .. } => ErrorCode::OutsideGeofence,
                SyncError::AlreadyRecorded(_) => ErrorCode::AlreadyRecorded,
                SyncError::Storage(_) => ErrorCode::DatabaseError,
                _ => ErrorCode::Internal,
            },
            CliError::Database(_) => ErrorCode::DatabaseError,
            CliError::Validation(_) | CliError::InvalidArgument(_) => ErrorCode::InvalidInput,
            CliError::Output(_) | CliError::Io(_) => ErrorCode::Internal,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// What a failed command prints.
///
/// ```json
/// { "code": "OUTSIDE_GEOFENCE", "message": "Outside office area: 812 m from office (allowed 500 m)" }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_errors_map_to_codes() {
        let cases = [
            (SyncError::NotAuthenticated, ErrorCode::NotAuthenticated),
            (SyncError::Network("reset".into()), ErrorCode::Offline),
            (SyncError::Timeout(15_000), ErrorCode::Offline),
            (
                SyncError::Http {
                    status: 500,
                    message: "boom".into(),
                },
                ErrorCode::Rejected,
            ),
            (
                SyncError::OutsideGeofence {
                    distance: 812.0,
                    radius: 500.0,
                    queued_id: Some("1-abcdef".into()),
                },
                ErrorCode::OutsideGeofence,
            ),
            (SyncError::AlreadyRecorded("done".into()), ErrorCode::AlreadyRecorded),
        ];

        for (error, code) in cases {
            assert_eq!(CliError::from(error).code(), code);
        }
    }

    #[test]
    fn test_report_serialization() {
        let report = CliError::InvalidArgument("month must be 1-12".into()).report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], "INVALID_INPUT");
        assert_eq!(json["message"], "Invalid argument: month must be 1-12");
        assert_eq!(report.code.exit_status(), 2);
    }
}
