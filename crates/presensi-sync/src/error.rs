//! # Sync Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Attendance          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  OutsideGeofence        │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Rejected               │ │
//! │  │  ConfigLoad/Save│  │  Http{status}   │  │  AlreadyRecorded        │ │
//! │  │                 │  │  Validation     │  │  InvalidInput           │ │
//! │  │                 │  │  Decode         │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Transport variants map onto the closed `FailureKind` set through      │
//! │  `failure_kind()`; the queue/propagate decision is made on that.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use thiserror::Error;

use presensi_core::{FailureKind, ValidationError};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure the engine and API client report.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// No connectivity, DNS failure, connection reset.
    #[error("Network error: {0}")]
    Network(String),

    /// The per-request timeout elapsed.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// HTTP 422 with per-field messages.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// No bearer token is stored.
    #[error("Not logged in")]
    NotAuthenticated,

    // =========================================================================
    // Attendance Outcomes
    // =========================================================================
    /// Resolved coordinates are outside the office radius. The action was
    /// queued (when `queued_id` is set) so it can be retried later.
    #[error("Outside office area: {distance:.0} m from office (allowed {radius:.0} m)")]
    OutsideGeofence {
        distance: f64,
        radius: f64,
        queued_id: Option<String>,
    },

    /// The server refused the attendance action.
    #[error("Attendance rejected: {message}")]
    Rejected {
        message: String,
        distance: Option<f64>,
        allowed_radius: Option<f64>,
    },

    /// The server already holds this record (HTTP 409).
    #[error("Attendance already recorded: {0}")]
    AlreadyRecorded(String),

    /// Local input validation failed before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    // =========================================================================
    // Storage & Internal
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] presensi_db::DbError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Sync agent is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(0)
        } else if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_builder() {
            SyncError::InvalidUrl(err.to_string())
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Classifies a backend call failure. `None` for errors that did not
    /// come from talking to the backend.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SyncError::Network(_) => Some(FailureKind::Network),
            SyncError::Timeout(_) => Some(FailureKind::Timeout),
            SyncError::Http { status, .. } => Some(FailureKind::HttpStatus(*status)),
            SyncError::Validation { fields, .. } => {
                Some(FailureKind::Validation(fields.keys().cloned().collect()))
            }
            SyncError::AlreadyRecorded(_) => Some(FailureKind::HttpStatus(409)),
            _ => None,
        }
    }

    /// True for failures a later attempt may overcome.
    pub fn is_retryable(&self) -> bool {
        self.failure_kind().is_some_and(|k| k.is_transient())
    }

    /// HTTP status, if the error carries one.
    pub fn status(&self) -> Option<u16> {
        self.failure_kind().and_then(|k| k.status())
    }

    /// True for 401/403 responses.
    pub fn is_auth_failure(&self) -> bool {
        self.failure_kind().is_some_and(|k| k.is_auth())
    }

    /// Message suitable for showing to the employee.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Validation { message, fields } => {
                let first = fields.values().flatten().next();
                match first {
                    Some(detail) if message.is_empty() => detail.clone(),
                    _ => message.clone(),
                }
            }
            SyncError::Http { message, .. } => message.clone(),
            SyncError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
