//! # Domain Types
//!
//! Core domain types used throughout the Presensi client.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ AttendanceEvent │   │ OfficeGeofence  │   │    Position     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  latitude       │   │  latitude       │       │
//! │  │  kind, date     │   │  longitude      │   │  longitude      │       │
//! │  │  lat/lng/acc    │   │  radius_meters  │   │  accuracy?      │       │
//! │  │  retries        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │   pending queue         configuration          sensor reading           │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌───────────────┐  ┌─────────────────┐      │
//! │  │ DailyAttendanceRecord│  │ LeaveRequest  │  │ EmployeeProfile │      │
//! │  │ LocalAttendanceTimes │  │ CalendarDay   │  │ ProfileUpdate   │      │
//! │  └──────────────────────┘  └───────────────┘  └─────────────────┘      │
//! │   server-confirmed read side and CRUD payloads                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Server-owned types are deliberately lenient (`#[serde(default)]`): the
//! backend omits fields freely and the client must never fail to render a
//! history list because one optional column was missing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;
use crate::{DEFAULT_OFFICE_LATITUDE, DEFAULT_OFFICE_LONGITUDE, DEFAULT_OFFICE_RADIUS_M};

// =============================================================================
// Attendance Kind
// =============================================================================

/// Which side of the working day an attendance action records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "kebab-case"))]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceKind {
    CheckIn,
    CheckOut,
}

impl AttendanceKind {
    /// Wire name used by the backend and the persisted queue.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AttendanceKind::CheckIn => "check-in",
            AttendanceKind::CheckOut => "check-out",
        }
    }
}

impl std::fmt::Display for AttendanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendanceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "check-in" | "check_in" | "checkin" | "in" => Ok(AttendanceKind::CheckIn),
            "check-out" | "check_out" | "checkout" | "out" => Ok(AttendanceKind::CheckOut),
            other => Err(CoreError::UnknownAttendanceKind(other.to_string())),
        }
    }
}

// =============================================================================
// Coordinates & Position
// =============================================================================

/// A bare latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
        }
    }
}

/// A location sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Sensor-reported confidence radius in meters.
    pub accuracy: Option<f64>,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Position {
            latitude,
            longitude,
            accuracy,
        }
    }

    #[inline]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// True when the reading meets the given accuracy target.
    /// Readings without an accuracy never meet it.
    pub fn meets_accuracy(&self, target_meters: f64) -> bool {
        matches!(self.accuracy, Some(acc) if acc <= target_meters)
    }
}

impl From<Coordinates> for Position {
    fn from(c: Coordinates) -> Self {
        Position::new(c.latitude, c.longitude, None)
    }
}

// =============================================================================
// Office Geofence
// =============================================================================

/// Circular boundary around the office that gates attendance actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OfficeGeofence {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl OfficeGeofence {
    pub const fn new(latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        OfficeGeofence {
            latitude,
            longitude,
            radius_meters,
        }
    }

    /// A fence with a zero centre component or a non-positive radius is
    /// treated as "not set up yet".
    pub fn is_configured(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.radius_meters.is_finite()
            && self.latitude != 0.0
            && self.longitude != 0.0
            && self.radius_meters > 0.0
    }

    #[inline]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl Default for OfficeGeofence {
    fn default() -> Self {
        OfficeGeofence::new(
            DEFAULT_OFFICE_LATITUDE,
            DEFAULT_OFFICE_LONGITUDE,
            DEFAULT_OFFICE_RADIUS_M,
        )
    }
}

// =============================================================================
// Attendance Event (pending queue entry)
// =============================================================================

/// An attendance action accepted locally but not yet confirmed by the
/// backend.
///
/// Only `retries` and `last_attempt` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AttendanceEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttendanceKind,
    /// Local calendar day the action belongs to.
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    /// Meters from the office, computed once when the entry was created.
    pub distance: Option<f64>,
    pub status: String,
    pub uploaded: bool,
    pub retries: u32,
    #[serde(rename = "lastAttempt")]
    #[ts(as = "Option<String>")]
    pub last_attempt: Option<DateTime<Utc>>,
}

impl AttendanceEvent {
    /// Creates a fresh, never-attempted entry with a generated id.
    pub fn new(
        kind: AttendanceKind,
        date: NaiveDate,
        position: Position,
        status: impl Into<String>,
    ) -> Self {
        AttendanceEvent {
            id: Self::generate_id(),
            kind,
            date,
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: position.accuracy,
            distance: None,
            status: status.into(),
            uploaded: false,
            retries: 0,
            last_attempt: None,
        }
    }

    /// Attaches the precomputed distance from the office.
    pub fn with_distance(mut self, distance: Option<f64>) -> Self {
        self.distance = distance;
        self
    }

    /// `<unix millis>-<6 random lowercase alphanumerics>`.
    pub fn generate_id() -> String {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
        format!("{}-{}", Utc::now().timestamp_millis(), suffix)
    }

    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude, self.accuracy)
    }

    /// Entries without an id cannot be addressed by the store and are
    /// discarded by the drain.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        self.id.trim().is_empty()
    }

    /// Records one failed upload attempt.
    pub fn record_failed_attempt(&mut self, at: DateTime<Utc>) {
        self.retries = self.retries.saturating_add(1);
        self.last_attempt = Some(at);
    }
}

// =============================================================================
// Daily Attendance (read side)
// =============================================================================

/// Local projection of today's (or any day's) confirmed check-in/out times,
/// kept so the UI shows continuity before the server history refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocalAttendanceTimes {
    /// `HH:MM`
    pub check_in: Option<String>,
    /// `HH:MM`
    pub check_out: Option<String>,
}

impl LocalAttendanceTimes {
    pub fn get(&self, kind: AttendanceKind) -> Option<&str> {
        match kind {
            AttendanceKind::CheckIn => self.check_in.as_deref(),
            AttendanceKind::CheckOut => self.check_out.as_deref(),
        }
    }

    pub fn set(&mut self, kind: AttendanceKind, time: Option<String>) {
        match kind {
            AttendanceKind::CheckIn => self.check_in = time,
            AttendanceKind::CheckOut => self.check_out = time,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.check_in.is_none() && self.check_out.is_none()
    }
}

/// A server-confirmed attendance day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct DailyAttendanceRecord {
    pub id: Option<i64>,
    pub date: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

impl DailyAttendanceRecord {
    /// The `YYYY-MM-DD` day this record belongs to, taken from the first of
    /// `date`, `created_at`, `check_in` that carries one.
    pub fn day_key(&self) -> Option<&str> {
        [&self.date, &self.created_at, &self.check_in]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| s.len() >= 10 && NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").is_ok())
            .map(|s| &s[..10])
    }

    pub fn belongs_to(&self, date: NaiveDate) -> bool {
        self.day_key() == Some(date.format("%Y-%m-%d").to_string().as_str())
    }
}

/// One day of the server's monthly calendar projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CalendarDay {
    pub date: String,
    pub status: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

// =============================================================================
// Leave Requests
// =============================================================================

/// A leave request as returned by the history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct LeaveRequest {
    pub id: Option<i64>,
    pub reason: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration: Option<String>,
    pub status: Option<String>,
    pub support_file: Option<String>,
    pub created_at: Option<String>,
}

/// A leave request about to be submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLeaveRequest {
    pub reason: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    /// Free-form duration label, e.g. "2 days".
    pub duration: String,
}

// =============================================================================
// Profile
// =============================================================================

/// The logged-in employee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct EmployeeProfile {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "photo_url")]
    pub photo: Option<String>,
}

/// Partial profile update; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.address.is_none()
    }

    /// Non-empty fields as form pairs, in a stable order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.clone().map(|v| (k, v)))
        .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_kind_parsing_and_display() {
        assert_eq!("check-in".parse::<AttendanceKind>().unwrap(), AttendanceKind::CheckIn);
        assert_eq!("OUT".parse::<AttendanceKind>().unwrap(), AttendanceKind::CheckOut);
        assert!("lunch".parse::<AttendanceKind>().is_err());
        assert_eq!(AttendanceKind::CheckOut.to_string(), "check-out");
    }

    #[test]
    fn test_event_serializes_with_wire_names() {
        let event = AttendanceEvent::new(
            AttendanceKind::CheckIn,
            date("2024-03-01"),
            Position::new(-7.0, 110.0, Some(12.0)),
            "Present",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "check-in");
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["retries"], 0);
        assert!(json["lastAttempt"].is_null());
    }

    #[test]
    fn test_generated_ids_are_time_prefixed_and_distinct() {
        let a = AttendanceEvent::generate_id();
        let b = AttendanceEvent::generate_id();
        assert_ne!(a, b);
        let (millis, suffix) = a.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 6);
    }

    #[test]
    fn test_failed_attempt_bookkeeping() {
        let mut event = AttendanceEvent::new(
            AttendanceKind::CheckOut,
            date("2024-03-01"),
            Position::new(-7.0, 110.0, None),
            "Present",
        );
        let now = Utc::now();
        event.record_failed_attempt(now);
        assert_eq!(event.retries, 1);
        assert_eq!(event.last_attempt, Some(now));
    }

    #[test]
    fn test_geofence_configured() {
        assert!(OfficeGeofence::default().is_configured());
        assert!(!OfficeGeofence::new(0.0, 110.0, 500.0).is_configured());
        assert!(!OfficeGeofence::new(-7.0, 110.0, 0.0).is_configured());
    }

    #[test]
    fn test_record_day_key_fallbacks() {
        let record = DailyAttendanceRecord {
            created_at: Some("2024-03-01T08:01:00Z".into()),
            ..Default::default()
        };
        assert_eq!(record.day_key(), Some("2024-03-01"));
        assert!(record.belongs_to(date("2024-03-01")));

        let only_time = DailyAttendanceRecord {
            check_in: Some("08:01".into()),
            ..Default::default()
        };
        assert_eq!(only_time.day_key(), None);
    }

    #[test]
    fn test_lenient_server_records() {
        let record: DailyAttendanceRecord =
            serde_json::from_str(r#"{"check_in":"08:00","extra":true}"#).unwrap();
        assert_eq!(record.check_in.as_deref(), Some("08:00"));
        assert!(record.id.is_none());
    }

    #[test]
    fn test_profile_photo_alias() {
        let profile: EmployeeProfile =
            serde_json::from_str(r#"{"name":"Sari","email":"s@x.id","photo_url":"p.jpg"}"#).unwrap();
        assert_eq!(profile.photo.as_deref(), Some("p.jpg"));
    }

    #[test]
    fn test_profile_update_form_fields() {
        let update = ProfileUpdate {
            name: Some("Sari".into()),
            phone: Some("0812".into()),
            ..Default::default()
        };
        assert_eq!(
            update.form_fields(),
            vec![("name", "Sari".to_string()), ("phone", "0812".to_string())]
        );
        assert!(ProfileUpdate::default().is_empty());
    }
}
