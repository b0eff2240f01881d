//! # Validation Module
//!
//! Input validation for everything the client sends to the backend.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI / CLI argument parsing                                    │
//! │  ├── Type validation (numbers, dates)                                  │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Rules the backend would otherwise answer with a 422               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                      │
//! │  └── Authoritative checks (geofence authority, duplicates, ...)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use presensi_core::validation::{validate_email, validate_password};
//!
//! validate_email("sari@kantor.id").unwrap();
//! assert!(validate_password("short", "short").is_err());
//! ```

use crate::error::ValidationError;
use crate::geofence::is_valid_coordinate;
use crate::types::{NewLeaveRequest, OfficeGeofence};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length accepted by the reset flow.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Upper bound on a configurable office radius, in meters.
pub const MAX_OFFICE_RADIUS_M: f64 = 50_000.0;

// =============================================================================
// Credentials
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - Must not be empty
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.find('.') {
        Some(i) if i > 0 && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates a new password and its confirmation.
pub fn validate_password(password: &str, confirmation: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    if password != confirmation {
        return Err(ValidationError::Mismatch {
            field: "password_confirmation".to_string(),
            other: "password".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Leave Requests
// =============================================================================

/// Validates a leave request before submission.
///
/// ## Rules
/// - Reason is required (max 255 characters)
/// - Duration label is required
/// - `start_date <= end_date`
pub fn validate_leave_request(req: &NewLeaveRequest) -> ValidationResult<()> {
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > 255 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 255,
        });
    }

    if req.duration.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "duration".to_string(),
        });
    }

    if req.end_date < req.start_date {
        return Err(ValidationError::InvalidRange {
            field: "end_date".to_string(),
            other: "start_date".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Geography
// =============================================================================

pub fn validate_coordinates(latitude: f64, longitude: f64) -> ValidationResult<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::OutOfRange {
            field: "latitude".to_string(),
            min: -90.0,
            max: 90.0,
        });
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::OutOfRange {
            field: "longitude".to_string(),
            min: -180.0,
            max: 180.0,
        });
    }
    if !is_valid_coordinate(latitude, longitude) {
        return Err(ValidationError::InvalidFormat {
            field: "coordinates".to_string(),
            reason: "(0, 0) is not a location fix".to_string(),
        });
    }
    Ok(())
}

/// Validates an office geofence before it is saved.
pub fn validate_geofence(fence: &OfficeGeofence) -> ValidationResult<()> {
    validate_coordinates(fence.latitude, fence.longitude)?;

    if !(fence.radius_meters.is_finite() && fence.radius_meters > 0.0) {
        return Err(ValidationError::MustBePositive {
            field: "radius".to_string(),
        });
    }
    if fence.radius_meters > MAX_OFFICE_RADIUS_M {
        return Err(ValidationError::OutOfRange {
            field: "radius".to_string(),
            min: 0.0,
            max: MAX_OFFICE_RADIUS_M,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
