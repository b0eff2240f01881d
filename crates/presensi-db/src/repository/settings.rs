//! # Settings Repository
//!
//! Key/value storage for session state, the cached profile and the office
//! geofence.
//!
//! ## Keys
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ token            │ bearer token from /login                             │
//! │ user_id          │ numeric id of the logged-in employee                 │
//! │ profile          │ EmployeeProfile as JSON                              │
//! │ profile_photo    │ photo URL or data: URI preview                       │
//! │ office_lat       │ office geofence centre latitude                      │
//! │ office_lng       │ office geofence centre longitude                     │
//! │ office_radius    │ office geofence radius in meters                     │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use presensi_core::{EmployeeProfile, OfficeGeofence};

/// Setting key names.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_ID: &str = "user_id";
    pub const PROFILE: &str = "profile";
    pub const PROFILE_PHOTO: &str = "profile_photo";
    pub const OFFICE_LAT: &str = "office_lat";
    pub const OFFICE_LNG: &str = "office_lng";
    pub const OFFICE_RADIUS: &str = "office_radius";

    /// Everything `clear_session` removes.
    pub const SESSION: [&str; 4] = [TOKEN, USER_ID, PROFILE, PROFILE_PHOTO];
}

const UPSERT: &str = r#"
    INSERT INTO settings (key, value, updated_at)
    VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

/// Repository for key/value settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    // =========================================================================
    // Raw access
    // =========================================================================

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing setting");

        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns `false` when the key was not set.
    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn token(&self) -> DbResult<Option<String>> {
        Ok(self.get(keys::TOKEN).await?.filter(|t| !t.is_empty()))
    }

    pub async fn set_token(&self, token: &str) -> DbResult<()> {
        self.set(keys::TOKEN, token).await
    }

    pub async fn user_id(&self) -> DbResult<Option<i64>> {
        Ok(self
            .get(keys::USER_ID)
            .await?
            .and_then(|v| v.trim().parse().ok()))
    }

    pub async fn set_user_id(&self, user_id: i64) -> DbResult<()> {
        self.set(keys::USER_ID, &user_id.to_string()).await
    }

    /// Removes the token, user id, cached profile and photo in one
    /// transaction.
    pub async fn clear_session(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys::SESSION {
            sqlx::query("DELETE FROM settings WHERE key = ?1")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Session cleared");
        Ok(())
    }

    // =========================================================================
    // Profile cache
    // =========================================================================

    pub async fn cached_profile(&self) -> DbResult<Option<EmployeeProfile>> {
        match self.get(keys::PROFILE).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DbError::corrupt("cached profile", e)),
            None => Ok(None),
        }
    }

    pub async fn cache_profile(&self, profile: &EmployeeProfile) -> DbResult<()> {
        let raw = serde_json::to_string(profile).map_err(|e| DbError::Internal(e.to_string()))?;
        self.set(keys::PROFILE, &raw).await?;

        if let Some(id) = profile.id {
            self.set_user_id(id).await?;
        }
        Ok(())
    }

    pub async fn profile_photo(&self) -> DbResult<Option<String>> {
        self.get(keys::PROFILE_PHOTO).await
    }

    pub async fn set_profile_photo(&self, photo: &str) -> DbResult<()> {
        self.set(keys::PROFILE_PHOTO, photo).await
    }

    // =========================================================================
    // Office geofence
    // =========================================================================

    /// The saved office geofence, or `None` if it was never saved.
    ///
    /// A partially saved or unparseable fence is reported as corrupt so the
    /// caller can fall back to its defaults.
    pub async fn office_geofence(&self) -> DbResult<Option<OfficeGeofence>> {
        let lat = self.get(keys::OFFICE_LAT).await?;
        let lng = self.get(keys::OFFICE_LNG).await?;
        let radius = self.get(keys::OFFICE_RADIUS).await?;

        let (lat, lng, radius) = match (lat, lng, radius) {
            (None, None, None) => return Ok(None),
            (Some(lat), Some(lng), Some(radius)) => (lat, lng, radius),
            _ => return Err(DbError::corrupt("office geofence", "partially saved")),
        };

        let parse = |name: &str, raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|e| DbError::corrupt(format!("office geofence {name}"), e))
        };

        Ok(Some(OfficeGeofence::new(
            parse("latitude", &lat)?,
            parse("longitude", &lng)?,
            parse("radius", &radius)?,
        )))
    }

    pub async fn save_office_geofence(&self, fence: &OfficeGeofence) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (keys::OFFICE_LAT, fence.latitude),
            (keys::OFFICE_LNG, fence.longitude),
            (keys::OFFICE_RADIUS, fence.radius_meters),
        ] {
            sqlx::query(UPSERT)
                .bind(key)
                .bind(value.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!(
            latitude = fence.latitude,
            longitude = fence.longitude,
            radius = fence.radius_meters,
            "Office geofence saved"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
