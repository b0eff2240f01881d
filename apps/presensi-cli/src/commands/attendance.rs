//! # Attendance Commands

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::warn;

use presensi_core::{AttendanceKind, CalendarDay, DailyAttendanceRecord};
use presensi_sync::{AttendanceSyncEngine, SubmitOutcome};

use crate::cli::MonthArgs;
use crate::error::CliResult;
use crate::output::Render;
use crate::state::AppContext;

/// Check-in or check-out. The position comes from the context's sensor.
pub async fn submit(ctx: &AppContext, kind: AttendanceKind) -> CliResult<SubmitOutcome> {
    Ok(ctx.engine.submit_attendance(kind, None).await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayView {
    pub date: NaiveDate,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    /// Actions for today still waiting in the pending queue.
    pub queued: Vec<AttendanceKind>,
}

impl Render for TodayView {
    fn render(&self) -> String {
        let mut out = format!(
            "{}\n  check-in:  {}\n  check-out: {}",
            self.date,
            self.check_in.as_deref().unwrap_or("-"),
            self.check_out.as_deref().unwrap_or("-"),
        );
        for kind in &self.queued {
            out.push_str(&format!("\n  {kind} waiting to sync"));
        }
        out
    }
}

/// Today's times. The local projection wins; when logged in, the server
/// history fills the gaps. A failed fetch falls back to local times only.
pub async fn today(ctx: &AppContext) -> CliResult<TodayView> {
    let date = AttendanceSyncEngine::today_date();

    let server = if ctx.is_logged_in().await {
        match ctx.api.attendance_history(date.month(), date.year()).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Could not fetch attendance history, showing local times");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let times = ctx.engine.today(&server).await?;
    let queued = ctx
        .engine
        .pending()
        .await?
        .into_iter()
        .filter(|event| event.date == date)
        .map(|event| event.kind)
        .collect();

    Ok(TodayView {
        date,
        check_in: times.check_in,
        check_out: times.check_out,
        queued,
    })
}

pub async fn history(ctx: &AppContext, month: MonthArgs) -> CliResult<Vec<DailyAttendanceRecord>> {
    let (month, year) = resolve_month(month, AttendanceSyncEngine::today_date());
    Ok(ctx.api.attendance_history(month, year).await?)
}

pub async fn calendar(ctx: &AppContext, month: MonthArgs) -> CliResult<Vec<CalendarDay>> {
    let (month, year) = resolve_month(month, AttendanceSyncEngine::today_date());
    Ok(ctx.api.attendance_calendar(month, year).await?)
}

/// Fills unset month/year from `today`.
fn resolve_month(args: MonthArgs, today: NaiveDate) -> (u32, i32) {
    (
        args.month.unwrap_or_else(|| today.month()),
        args.year.unwrap_or_else(|| today.year()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use presensi_core::{Position, DEFAULT_OFFICE_LATITUDE, DEFAULT_OFFICE_LONGITUDE};
    use presensi_sync::{QueueReason, SyncError};

    use crate::error::{CliError, ErrorCode};
    use crate::state::test_context;

    #[test]
    fn test_resolve_month() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(resolve_month(MonthArgs::default(), today), (3, 2024));
        assert_eq!(
            resolve_month(
                MonthArgs {
                    month: Some(12),
                    year: Some(2023)
                },
                today
            ),
            (12, 2023)
        );
    }

    #[tokio::test]
    async fn test_check_in_outside_fence_is_queued() {
        let ctx = test_context(Some(Position::new(-6.2, 106.8, Some(10.0)))).await;

        let err = submit(&ctx, AttendanceKind::CheckIn).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutsideGeofence);
        let CliError::Sync(SyncError::OutsideGeofence { queued_id, .. }) = err else {
            panic!("expected outside geofence");
        };
        assert!(queued_id.is_some());

        let view = today(&ctx).await.unwrap();
        assert_eq!(view.queued, vec![AttendanceKind::CheckIn]);
        assert!(view.check_in.is_none());
    }

    #[tokio::test]
    async fn test_check_in_offline_is_deferred() {
        let ctx = test_context(Some(Position::new(
            DEFAULT_OFFICE_LATITUDE,
            DEFAULT_OFFICE_LONGITUDE,
            Some(10.0),
        )))
        .await;
        ctx.db.settings().set_token("token-123").await.unwrap();

        let outcome = submit(&ctx, AttendanceKind::CheckIn).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Queued {
                id: Some(_),
                reason: QueueReason::Deferred
            }
        ));
        assert_eq!(ctx.engine.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_check_in_requires_login() {
        let ctx = test_context(None).await;
        let err = submit(&ctx, AttendanceKind::CheckIn).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAuthenticated);
        assert_eq!(ctx.engine.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_today_uses_local_times_when_logged_out() {
        let ctx = test_context(None).await;
        let date = AttendanceSyncEngine::today_date();
        ctx.db
            .attendance_times()
            .mark(date, AttendanceKind::CheckIn, "07:58")
            .await
            .unwrap();

        let view = today(&ctx).await.unwrap();
        assert_eq!(view.date, date);
        assert_eq!(view.check_in.as_deref(), Some("07:58"));
        assert!(view.check_out.is_none());
        assert!(view.queued.is_empty());
    }
}
