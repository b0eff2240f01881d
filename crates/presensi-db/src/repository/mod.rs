//! # Repository Module
//!
//! Database repository implementations for the Presensi client.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  AttendanceSyncEngine                                                  │
//! │       │                                                                 │
//! │       │  db.pending_queue().append(event)                              │
//! │       ▼                                                                 │
//! │  PendingQueueRepository                                                │
//! │  ├── append / list / get_by_id / count                                 │
//! │  ├── update_by_id                                                      │
//! │  └── remove_by_id / remove_by_type_and_date                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  All removals and updates are "if present": calling them twice, or     │
//! │  racing the drain loop against a direct submit, never errors.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`pending::PendingQueueRepository`] - Durable queue of unconfirmed attendance
//! - [`settings::SettingsRepository`] - Key/value settings (session, profile, office)
//! - [`attendance_times::AttendanceTimesRepository`] - Local check-in/out projection

pub mod attendance_times;
pub mod pending;
pub mod settings;
