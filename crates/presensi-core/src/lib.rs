//! # presensi-core: Pure Domain Logic for the Presensi Client
//!
//! This crate holds everything about attendance that can be decided
//! without touching the network, the disk, or the location sensor.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Presensi Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 UI pages / presensi-cli                         │   │
//! │  │    Presensi ──► Beranda ──► Riwayat ──► Profil                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                presensi-sync (engine, REST client)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ presensi-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ geofence  │  │  policy   │  │ validation│  │   │
//! │  │   │ Attendance│  │ haversine │  │ queue or  │  │  rules    │  │   │
//! │  │   │   Event   │  │  radius   │  │ propagate │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (AttendanceEvent, OfficeGeofence, Position, ...)
//! - [`geofence`] - Great-circle distance and geofence membership
//! - [`policy`] - Failure classification and queue/drop/propagate decisions
//! - [`time`] - Time-of-day normalisation for the local projection
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use presensi_core::geofence::{distance_meters, is_inside_geofence};
//! use presensi_core::OfficeGeofence;
//!
//! let office = OfficeGeofence::default();
//! let d = distance_meters(office.latitude, office.longitude, office.latitude, office.longitude);
//! assert_eq!(d, 0.0);
//! assert!(is_inside_geofence(office.latitude, office.longitude, &office));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod geofence;
pub mod policy;
pub mod time;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use policy::{DrainDecision, FailureKind, RemovalReason, SubmitDecision};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default office latitude used when no geofence has been saved yet.
pub const DEFAULT_OFFICE_LATITUDE: f64 = -7.037943980089189;

/// Default office longitude used when no geofence has been saved yet.
pub const DEFAULT_OFFICE_LONGITUDE: f64 = 110.47993371532893;

/// Default allowed distance from the office, in meters.
pub const DEFAULT_OFFICE_RADIUS_M: f64 = 500.0;

/// Status label forwarded to the backend when the caller gives none.
pub const DEFAULT_ATTENDANCE_STATUS: &str = "Present";

/// Pending entries are abandoned once they have failed this many uploads.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
