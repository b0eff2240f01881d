//! # State Module
//!
//! Everything a command needs, built once per invocation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AppContext                                     │
//! │                                                                         │
//! │  ClientConfig ──► Database (SQLite, migrations)                        │
//! │                      │                                                  │
//! │                      ├──► SessionGuard ──► ApiClient                   │
//! │                      │                         │                        │
//! │  --lat/--lng ──► StaticSensor                  │                        │
//! │  (none)      ──► UnavailableSensor             │                        │
//! │                      │                         │                        │
//! │                      ▼                         ▼                        │
//! │                  GeoProvider ──────► AttendanceSyncEngine              │
//! │                                      (persisted office fence applied)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod context;

pub use context::AppContext;

#[cfg(test)]
pub(crate) use context::tests::context as test_context;
