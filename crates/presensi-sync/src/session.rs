//! # Session Guard
//!
//! Cross-cutting response inspection for authentication failures.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  response error                                                        │
//! │       │                                                                 │
//! │       ├── not 401/403 ─────────────────────────► ignored               │
//! │       │                                                                 │
//! │       ├── 401/403, Background (X-Background-Sync) ─► warn only;        │
//! │       │                                         queue policy decides   │
//! │       │                                                                 │
//! │       └── 401/403, Foreground ──► clear token/profile                  │
//! │                                    broadcast SessionEvent::Expired     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::broadcast;
use tracing::{info, warn};

use presensi_core::EmployeeProfile;
use presensi_db::SettingsRepository;

use crate::error::{SyncError, SyncResult};
use crate::response::LoginResponse;

/// Who issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// A user-facing screen is waiting on it.
    Foreground,
    /// Queue drain or sync submit; tagged with `X-Background-Sync: 1`.
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: Option<i64> },
    LoggedOut,
    /// The backend refused the token on a foreground request.
    Expired { status: u16 },
}

/// Owns the persisted session and tells observers when it ends.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    settings: SettingsRepository,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionGuard {
    pub fn new(settings: SettingsRepository) -> Self {
        let (events, _) = broadcast::channel(16);
        SessionGuard { settings, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn token(&self) -> SyncResult<Option<String>> {
        Ok(self.settings.token().await?)
    }

    pub async fn is_logged_in(&self) -> bool {
        matches!(self.settings.token().await, Ok(Some(_)))
    }

    /// Reacts to a failed request. Returns true when the session was torn
    /// down.
    pub async fn inspect(&self, error: &SyncError, origin: RequestOrigin) -> bool {
        let Some(status) = error.status().filter(|_| error.is_auth_failure()) else {
            return false;
        };

        match origin {
            RequestOrigin::Background => {
                warn!(status, "Background request refused by backend; keeping session");
                false
            }
            RequestOrigin::Foreground => {
                warn!(status, "Session rejected by backend, logging out");
                if let Err(e) = self.settings.clear_session().await {
                    tracing::error!(error = %e, "Failed to clear session");
                }
                let _ = self.events.send(SessionEvent::Expired { status });
                true
            }
        }
    }

    /// Persists a successful login.
    pub async fn store_login(&self, login: &LoginResponse) -> SyncResult<()> {
        let token = login
            .token
            .as_deref()
            .ok_or_else(|| SyncError::Decode("login response carried no token".into()))?;

        self.settings.set_token(token).await?;
        let user_id = match &login.user {
            Some(user) => {
                self.remember_profile(user).await?;
                user.id
            }
            None => None,
        };

        info!(user_id = ?user_id, "Logged in");
        let _ = self.events.send(SessionEvent::LoggedIn { user_id });
        Ok(())
    }

    /// Caches the profile (and its photo, when it has one).
    pub async fn remember_profile(&self, profile: &EmployeeProfile) -> SyncResult<()> {
        self.settings.cache_profile(profile).await?;
        if let Some(photo) = profile.photo.as_deref().filter(|p| !p.is_empty()) {
            self.settings.set_profile_photo(photo).await?;
        }
        Ok(())
    }

    pub async fn logout(&self) -> SyncResult<()> {
        self.settings.clear_session().await?;
        info!("Logged out");
        let _ = self.events.send(SessionEvent::LoggedOut);
        Ok(())
    }
}
