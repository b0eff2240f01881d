//! # Geofence Calculator
//!
//! Great-circle distance and office-radius membership.
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                    ╭───────────── radius ─────────────╮                 │
//! │                 ╭──┴──╮                                                 │
//! │               ╱   ●    ╲        ● office centre                         │
//! │              │  inside  │       ✕ user reading                          │
//! │               ╲        ╱                                                │
//! │                 ╰─────╯    ✕  outside (distance > radius)               │
//! │                                                                         │
//! │  Spherical earth, R = 6 371 000 m, haversine formula.                   │
//! │  Unconfigured fence (zero centre / zero radius) ⇒ always inside.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{Coordinates, OfficeGeofence};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/lon pairs (degrees).
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance from a point to the fence centre, rounded to whole meters.
pub fn distance_from_office(point: Coordinates, fence: &OfficeGeofence) -> f64 {
    distance_meters(point.latitude, point.longitude, fence.latitude, fence.longitude).round()
}

/// Rejects non-finite values, the (0,0) no-fix sentinel and out-of-range
/// magnitudes.
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    if !lat.is_finite() || !lon.is_finite() {
        return false;
    }
    if lat == 0.0 && lon == 0.0 {
        return false;
    }
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Fail-open when the fence is not configured.
pub fn is_inside_geofence(lat: f64, lon: f64, fence: &OfficeGeofence) -> bool {
    if !fence.is_configured() {
        return true;
    }
    distance_meters(lat, lon, fence.latitude, fence.longitude) <= fence.radius_meters
}

// =============================================================================
// Unit Tests
// =============================================================================
