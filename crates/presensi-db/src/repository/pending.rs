//! # Pending-Queue Repository
//!
//! Durable local log of attendance actions the backend has not confirmed.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  submit path fails / is gated                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  append(event) ──► INSERT (seq = insertion order)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  drain loop: list() ORDER BY seq                                       │
//! │       │                                                                 │
//! │       ├── upload ok / 409 / 4xx / exhausted ──► remove_by_id(id)       │
//! │       │                                                                 │
//! │       └── network / timeout / 5xx ──► update_by_id(retries+1)          │
//! │                                                                         │
//! │  direct submit ok ──► remove_by_type_and_date(kind, date)              │
//! │                       (clears a stale duplicate, if any)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows that fail to decode are skipped by [`list`] with a warning, so a
//! single corrupt entry never hides the others. The drain loop deletes them
//! through [`purge_undecodable`].
//!
//! [`list`]: PendingQueueRepository::list
//! [`purge_undecodable`]: PendingQueueRepository::purge_undecodable

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use presensi_core::{AttendanceEvent, AttendanceKind};

const SELECT_COLUMNS: &str = r#"
    SELECT id, kind, date, latitude, longitude, accuracy, distance,
           status, uploaded, retries, last_attempt
    FROM pending_attendance
"#;

const SELECT_COLUMNS_WITH_SEQ: &str = r#"
    SELECT seq, id, kind, date, latitude, longitude, accuracy, distance,
           status, uploaded, retries, last_attempt
    FROM pending_attendance
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct PendingRow {
    id: String,
    kind: String,
    date: NaiveDate,
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    distance: Option<f64>,
    status: String,
    uploaded: bool,
    retries: i64,
    last_attempt: Option<DateTime<Utc>>,
}

impl TryFrom<PendingRow> for AttendanceEvent {
    type Error = DbError;

    fn try_from(row: PendingRow) -> Result<Self, Self::Error> {
        let kind: AttendanceKind = row
            .kind
            .parse()
            .map_err(|e| DbError::corrupt("pending entry kind", e))?;

        Ok(AttendanceEvent {
            id: row.id,
            kind,
            date: row.date,
            latitude: row.latitude,
            longitude: row.longitude,
            accuracy: row.accuracy,
            distance: row.distance,
            status: row.status,
            uploaded: row.uploaded,
            retries: u32::try_from(row.retries).unwrap_or(u32::MAX),
            last_attempt: row.last_attempt,
        })
    }
}

fn decode_row(row: &SqliteRow) -> DbResult<AttendanceEvent> {
    PendingRow::from_row(row)?.try_into()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the pending attendance queue.
#[derive(Debug, Clone)]
pub struct PendingQueueRepository {
    pool: SqlitePool,
}

impl PendingQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PendingQueueRepository { pool }
    }

    /// Persists an entry and returns its id.
    ///
    /// An entry arriving without an id gets a freshly generated one.
    pub async fn append(&self, mut event: AttendanceEvent) -> DbResult<String> {
        if event.is_malformed() {
            event.id = AttendanceEvent::generate_id();
        }

        debug!(
            id = %event.id,
            kind = %event.kind,
            date = %event.date,
            "Appending pending attendance"
        );

        sqlx::query(
            r#"
            INSERT INTO pending_attendance (
                id, kind, date, latitude, longitude, accuracy, distance,
                status, uploaded, retries, last_attempt
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&event.id)
        .bind(event.kind)
        .bind(event.date)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.accuracy)
        .bind(event.distance)
        .bind(&event.status)
        .bind(event.uploaded)
        .bind(i64::from(event.retries))
        .bind(event.last_attempt)
        .execute(&self.pool)
        .await?;

        Ok(event.id)
    }

    /// Snapshot of the queue in insertion order.
    pub async fn list(&self) -> DbResult<Vec<AttendanceEvent>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_row(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "Skipping undecodable pending entry"),
            }
        }
        Ok(entries)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<AttendanceEvent>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_row).transpose()
    }

    /// Replaces the stored entry with the same id. Returns `false` when no
    /// such entry exists.
    pub async fn update_by_id(&self, event: &AttendanceEvent) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_attendance SET
                kind = ?2,
                date = ?3,
                latitude = ?4,
                longitude = ?5,
                accuracy = ?6,
                distance = ?7,
                status = ?8,
                uploaded = ?9,
                retries = ?10,
                last_attempt = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&event.id)
        .bind(event.kind)
        .bind(event.date)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.accuracy)
        .bind(event.distance)
        .bind(&event.status)
        .bind(event.uploaded)
        .bind(i64::from(event.retries))
        .bind(event.last_attempt)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes the entry with the given id. Returns `false` when it was
    /// already gone.
    pub async fn remove_by_id(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM pending_attendance WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every entry for `(kind, date)`, returning how many went.
    pub async fn remove_by_type_and_date(
        &self,
        kind: AttendanceKind,
        date: NaiveDate,
    ) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM pending_attendance WHERE kind = ?1 AND date = ?2")
            .bind(kind)
            .bind(date)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            debug!(
                kind = %kind,
                date = %date,
                removed = result.rows_affected(),
                "Removed stale pending duplicates"
            );
        }
        Ok(result.rows_affected())
    }

    /// Deletes every row that no longer decodes into an [`AttendanceEvent`]
    /// and returns the ids of what went. A row whose id is unreadable is
    /// reported as `seq-<n>`.
    pub async fn purge_undecodable(&self) -> DbResult<Vec<String>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS_WITH_SEQ} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await?;

        let mut purged = Vec::new();
        for row in &rows {
            let Err(e) = decode_row(row) else {
                continue;
            };
            let seq: i64 = row.try_get("seq")?;
            let id = row
                .try_get::<Option<String>, _>("id")
                .ok()
                .flatten()
                .unwrap_or_else(|| format!("seq-{seq}"));

            warn!(seq, id = %id, error = %e, "Purging undecodable pending entry");
            sqlx::query("DELETE FROM pending_attendance WHERE seq = ?1")
                .bind(seq)
                .execute(&self.pool)
                .await?;
            purged.push(id);
        }
        Ok(purged)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pending_attendance")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
