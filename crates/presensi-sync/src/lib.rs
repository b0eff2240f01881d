//! # presensi-sync: Attendance Sync Engine for the Presensi Client
//!
//! This crate owns the offline-tolerant attendance flow: resolving a
//! position, checking it against the office geofence, submitting it to the
//! REST backend, and parking it in the local pending queue when the backend
//! cannot take it yet.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Attendance Sync Architecture                     │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                AttendanceSyncEngine (engine.rs)                  │  │
//! │  │                                                                  │  │
//! │  │  check_in / check_out ──► submit now, or enqueue                │  │
//! │  │  drain_queue ──► upload queued entries in order                 │  │
//! │  └───────┬──────────────────┬──────────────────┬────────────────────┘  │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  GeoProvider   │  │   ApiClient    │  │  DrainScheduler        │    │
//! │  │                │  │                │  │                        │    │
//! │  │ sensor retries │  │ reqwest,       │  │ one deferred timer,    │    │
//! │  │ & best fix     │  │ multipart,     │  │ rate-limit window      │    │
//! │  │                │  │ SessionGuard   │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌──────────────────────────────────────────────┐  │
//! │  │   SyncAgent    │  │  ChangeNotifier                              │  │
//! │  │                │  │                                              │  │
//! │  │ periodic drain │  │ Confirmed / Queued / Resolved / Abandoned    │  │
//! │  │ connectivity   │  │ broadcast to UI subscribers                  │  │
//! │  └────────────────┘  └──────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - Background `SyncAgent` (ticks, connectivity, status)
//! - [`api`] - REST client and the `AttendanceTransport` seam
//! - [`config`] - Client configuration (backend, office, geo, sync tuning)
//! - [`engine`] - Submit and drain state machine
//! - [`error`] - Sync error types
//! - [`geo`] - Location sensor abstraction with retry
//! - [`notifier`] - Attendance change broadcasts
//! - [`response`] - Backend response normalization
//! - [`scheduler`] - Coalescing drain timer
//! - [`session`] - Bearer token storage and expiry handling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use presensi_sync::{ApiClient, AttendanceSyncEngine, ClientConfig, GeoProvider, SessionGuard};
//!
//! let config = ClientConfig::load_or_default(None);
//! let session = SessionGuard::new(db.settings());
//! let api = Arc::new(ApiClient::new(&config.api, session)?);
//! let engine = AttendanceSyncEngine::new(&db, geo, api, &config);
//!
//! match engine.check_in(None).await? {
//!     SubmitOutcome::Confirmed { time, .. } => println!("Checked in at {time:?}"),
//!     SubmitOutcome::Queued { reason, .. } => println!("Saved offline ({reason})"),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod notifier;
pub mod response;
pub mod scheduler;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{ConnectivityEvent, NoOpEmitter, SyncAgent, SyncAgentHandle, SyncEventEmitter, SyncStatus};
pub use api::{ApiClient, AttendanceTransport, SubmitForm};
pub use config::{ApiSettings, ClientConfig, GeoSettings, OfficeSettings, StorageSettings, SyncSettings};
pub use engine::{AttendanceSyncEngine, DrainReport, SkipReason, SubmitOutcome};
pub use error::{SyncError, SyncResult};
pub use geo::{GeoProvider, LocationSensor, SensorError, StaticSensor, UnavailableSensor};
pub use notifier::{AttendanceChange, ChangeNotifier, QueueReason};
pub use response::{LoginResponse, Rejection, SubmitResponse};
pub use scheduler::{DrainScheduler, ScheduleOutcome};
pub use session::{RequestOrigin, SessionEvent, SessionGuard};
