//! # Local Attendance Times Repository
//!
//! Per-date `HH:MM` projection of confirmed check-in/out, written on every
//! successful sync so the home screen shows today's times before the server
//! history has been refetched.

use chrono::NaiveDate;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use presensi_core::{AttendanceKind, LocalAttendanceTimes};

#[derive(Debug, FromRow)]
struct TimesRow {
    check_in: Option<String>,
    check_out: Option<String>,
}

/// Repository for the local attendance time projection.
#[derive(Debug, Clone)]
pub struct AttendanceTimesRepository {
    pool: SqlitePool,
}

impl AttendanceTimesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AttendanceTimesRepository { pool }
    }

    /// Times recorded for `date`; empty when nothing was recorded.
    pub async fn get(&self, date: NaiveDate) -> DbResult<LocalAttendanceTimes> {
        let row: Option<TimesRow> =
            sqlx::query_as("SELECT check_in, check_out FROM attendance_times WHERE date = ?1")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .map(|r| LocalAttendanceTimes {
                check_in: r.check_in,
                check_out: r.check_out,
            })
            .unwrap_or_default())
    }

    /// Sets one side of the day, leaving the other untouched.
    pub async fn mark(&self, date: NaiveDate, kind: AttendanceKind, time: &str) -> DbResult<()> {
        debug!(date = %date, kind = %kind, time = %time, "Marking local attendance time");

        let sql = match kind {
            AttendanceKind::CheckIn => {
                r#"
                INSERT INTO attendance_times (date, check_in) VALUES (?1, ?2)
                ON CONFLICT(date) DO UPDATE SET
                    check_in = excluded.check_in,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                "#
            }
            AttendanceKind::CheckOut => {
                r#"
                INSERT INTO attendance_times (date, check_out) VALUES (?1, ?2)
                ON CONFLICT(date) DO UPDATE SET
                    check_out = excluded.check_out,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                "#
            }
        };

        sqlx::query(sql)
            .bind(date)
            .bind(time)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Overwrites both sides of the day.
    pub async fn save(&self, date: NaiveDate, times: &LocalAttendanceTimes) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_times (date, check_in, check_out) VALUES (?1, ?2, ?3)
            ON CONFLICT(date) DO UPDATE SET
                check_in = excluded.check_in,
                check_out = excluded.check_out,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(date)
        .bind(&times.check_in)
        .bind(&times.check_out)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drops every day strictly before `date`.
    pub async fn prune_before(&self, date: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM attendance_times WHERE date < ?1")
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn repo() -> AttendanceTimesRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .attendance_times()
    }

    #[tokio::test]
    async fn test_unknown_day_is_empty() {
        let repo = repo().await;
        assert!(repo.get(day(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_keeps_other_side() {
        let repo = repo().await;
        repo.mark(day(1), AttendanceKind::CheckIn, "08:01").await.unwrap();
        repo.mark(day(1), AttendanceKind::CheckOut, "17:05").await.unwrap();
        repo.mark(day(1), AttendanceKind::CheckIn, "07:59").await.unwrap();

        let times = repo.get(day(1)).await.unwrap();
        assert_eq!(times.check_in.as_deref(), Some("07:59"));
        assert_eq!(times.check_out.as_deref(), Some("17:05"));
    }

    #[tokio::test]
    async fn test_save_and_prune() {
        let repo = repo().await;
        let times = LocalAttendanceTimes {
            check_in: Some("08:00".into()),
            check_out: None,
        };
        repo.save(day(1), &times).await.unwrap();
        repo.save(day(5), &times).await.unwrap();

        assert_eq!(repo.prune_before(day(5)).await.unwrap(), 1);
        assert!(repo.get(day(1)).await.unwrap().is_empty());
        assert_eq!(repo.get(day(5)).await.unwrap(), times);
    }
}
