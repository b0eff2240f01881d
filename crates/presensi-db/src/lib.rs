//! # presensi-db: Local Persistence for the Presensi Client
//!
//! SQLite storage for everything the client must remember across restarts:
//! the pending attendance queue, the session and cached profile, the office
//! geofence, and the per-day local check-in/out times.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Presensi Data Flow                               │
//! │                                                                         │
//! │  AttendanceSyncEngine (presensi-sync)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   presensi-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────────┐  ┌────────────┐ │   │
//! │  │   │   Database    │    │    Repositories     │  │ Migrations │ │   │
//! │  │   │   (pool.rs)   │    │                     │  │ (embedded) │ │   │
//! │  │   │               │    │ PendingQueueRepo    │  │            │ │   │
//! │  │   │ SqlitePool    │◄───│ SettingsRepo        │  │ 001_init   │ │   │
//! │  │   │               │    │ AttendanceTimesRepo │  │            │ │   │
//! │  │   └───────────────┘    └─────────────────────┘  └────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/presensi/presensi.db                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use presensi_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("presensi.db")).await?;
//! let pending = db.pending_queue().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::attendance_times::AttendanceTimesRepository;
pub use repository::pending::PendingQueueRepository;
pub use repository::settings::{keys as setting_keys, SettingsRepository};
