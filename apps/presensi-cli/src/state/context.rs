use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use tracing::{debug, info, warn};

use presensi_core::Position;
use presensi_db::{Database, DbConfig};
use presensi_sync::{
    ApiClient, AttendanceSyncEngine, ClientConfig, GeoProvider, LocationSensor, SessionGuard,
    StaticSensor, UnavailableSensor,
};

use crate::error::CliResult;

/// Local attendance times older than this are pruned on startup.
const LOCAL_TIMES_RETENTION_DAYS: i64 = 62;

/// Wired-up client for one command.
pub struct AppContext {
    pub config: ClientConfig,
    pub db: Database,
    pub api: Arc<ApiClient>,
    pub engine: AttendanceSyncEngine,
}

impl AppContext {
    /// Opens the configured database and wires the client.
    pub async fn open(config: ClientConfig, position: Option<Position>) -> CliResult<Self> {
        let path = config.database_path();
        info!(path = %path.display(), "Opening local database");
        let db = Database::new(DbConfig::new(path)).await?;
        Self::with_database(config, db, position).await
    }

    /// Wires the client over an already opened database.
    ///
    /// With a `position` the engine reads it from a [`StaticSensor`];
    /// without one there is no sensor and submits fall back to the office
    /// centre.
    pub async fn with_database(
        mut config: ClientConfig,
        db: Database,
        position: Option<Position>,
    ) -> CliResult<Self> {
        let sensor: Arc<dyn LocationSensor> = match position {
            Some(position) => {
                debug!(?position, "Using position from the command line");
                // A fixed reading never improves.
                config.geo.max_attempts = 1;
                Arc::new(StaticSensor(position))
            }
            None => Arc::new(UnavailableSensor),
        };

        let session = SessionGuard::new(db.settings());
        let api = Arc::new(ApiClient::new(&config.api, session)?);
        let geo = GeoProvider::new(sensor, config.geo.clone());
        let engine = AttendanceSyncEngine::new(&db, geo, api.clone(), &config);
        engine.load_persisted_fence().await;

        let cutoff = AttendanceSyncEngine::today_date() - ChronoDuration::days(LOCAL_TIMES_RETENTION_DAYS);
        match db.attendance_times().prune_before(cutoff).await {
            Ok(0) => {}
            Ok(pruned) => debug!(pruned, "Pruned old local attendance times"),
            Err(e) => warn!(error = %e, "Failed to prune local attendance times"),
        }

        Ok(AppContext {
            config,
            db,
            api,
            engine,
        })
    }

    pub async fn is_logged_in(&self) -> bool {
        self.api.session().is_logged_in().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use presensi_core::{AttendanceKind, OfficeGeofence};

    pub(crate) async fn context(position: Option<Position>) -> AppContext {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = ClientConfig::default();
        config.api.base_url = "http://127.0.0.1:9/api".into();
        config.api.timeout_secs = 1;
        config.geo.max_attempts = 1;
        AppContext::with_database(config, db, position).await.unwrap()
    }

    #[tokio::test]
    async fn test_fresh_context() {
        let ctx = context(None).await;
        assert!(!ctx.is_logged_in().await);
        assert_eq!(ctx.engine.fence(), ctx.config.office_geofence());
        assert_eq!(ctx.engine.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_static_position_uses_single_attempt() {
        let ctx = context(Some(Position::new(-7.0, 110.0, Some(80.0)))).await;
        assert_eq!(ctx.config.geo.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_persisted_fence_applied_on_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let saved = OfficeGeofence::new(-6.2, 106.8, 250.0);
        db.settings().save_office_geofence(&saved).await.unwrap();

        let ctx = AppContext::with_database(ClientConfig::default(), db, None)
            .await
            .unwrap();
        assert_eq!(ctx.engine.fence(), saved);
    }

    #[tokio::test]
    async fn test_old_local_times_pruned() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let old = AttendanceSyncEngine::today_date() - ChronoDuration::days(LOCAL_TIMES_RETENTION_DAYS + 5);
        let today = AttendanceSyncEngine::today_date();
        db.attendance_times().mark(old, AttendanceKind::CheckIn, "08:00").await.unwrap();
        db.attendance_times().mark(today, AttendanceKind::CheckIn, "08:05").await.unwrap();

        let ctx = AppContext::with_database(ClientConfig::default(), db, None)
            .await
            .unwrap();
        assert!(ctx.engine.local_times(old).await.unwrap().is_empty());
        assert_eq!(
            ctx.engine.local_times(today).await.unwrap().check_in.as_deref(),
            Some("08:05")
        );
    }
}
