//! # GeoProvider
//!
//! Best-effort location acquisition on top of a platform sensor.
//!
//! ## Acquisition Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  attempt 1..=max_attempts                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  timeout(attempt_timeout, sensor.read())                               │
//! │       │                                                                 │
//! │       ├── valid, accuracy <= target ──► return it                      │
//! │       │                                                                 │
//! │       ├── valid, not accurate enough ─► remember, sleep 500 ms          │
//! │       │                                                                 │
//! │       └── error / timeout / (0,0) ────► sleep 300 ms                    │
//! │                                                                         │
//! │  loop exhausted ──► last remembered reading, or None                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use presensi_core::geofence::is_valid_coordinate;
use presensi_core::Position;

use crate::config::GeoSettings;

// =============================================================================
// Sensor Seam
// =============================================================================

/// Why a single sensor read failed.
#[derive(Debug, Clone, Error)]
pub enum SensorError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Platform location sensor.
#[async_trait]
pub trait LocationSensor: Send + Sync {
    async fn read(&self) -> Result<Position, SensorError>;
}

/// Always reports the same position. Used when coordinates come from the
/// command line or a fixed kiosk location.
#[derive(Debug, Clone, Copy)]
pub struct StaticSensor(pub Position);

#[async_trait]
impl LocationSensor for StaticSensor {
    async fn read(&self) -> Result<Position, SensorError> {
        Ok(self.0)
    }
}

/// A device with no location hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSensor;

#[async_trait]
impl LocationSensor for UnavailableSensor {
    async fn read(&self) -> Result<Position, SensorError> {
        Err(SensorError::Unavailable("no location sensor".to_string()))
    }
}

// =============================================================================
// GeoProvider
// =============================================================================

/// Wraps a [`LocationSensor`] with bounded retries and accuracy seeking.
/// Never fails: "no fix" is `None`.
#[derive(Clone)]
pub struct GeoProvider {
    sensor: Arc<dyn LocationSensor>,
    settings: GeoSettings,
}

impl GeoProvider {
    pub fn new(sensor: Arc<dyn LocationSensor>, settings: GeoSettings) -> Self {
        GeoProvider { sensor, settings }
    }

    pub fn settings(&self) -> &GeoSettings {
        &self.settings
    }

    pub async fn acquire(&self) -> Option<Position> {
        let attempts = self.settings.max_attempts.max(1);
        let per_attempt = Duration::from_secs(self.settings.attempt_timeout_secs);
        let mut last: Option<Position> = None;

        for attempt in 1..=attempts {
            let is_last = attempt == attempts;

            match tokio::time::timeout(per_attempt, self.sensor.read()).await {
                Ok(Ok(pos)) if is_valid_coordinate(pos.latitude, pos.longitude) => {
                    debug!(
                        attempt,
                        latitude = pos.latitude,
                        longitude = pos.longitude,
                        accuracy = ?pos.accuracy,
                        "Position reading"
                    );
                    if pos.meets_accuracy(self.settings.target_accuracy_m) {
                        return Some(pos);
                    }
                    last = Some(pos);
                    if !is_last {
                        tokio::time::sleep(Duration::from_millis(self.settings.inaccurate_delay_ms))
                            .await;
                    }
                }
                outcome => {
                    match outcome {
                        Ok(Ok(pos)) => warn!(
                            attempt,
                            latitude = pos.latitude,
                            longitude = pos.longitude,
                            "Discarding invalid position reading"
                        ),
                        Ok(Err(e)) => warn!(attempt, error = %e, "Position attempt failed"),
                        Err(_) => warn!(attempt, "Position attempt timed out"),
                    }
                    if !is_last {
                        tokio::time::sleep(Duration::from_millis(self.settings.failure_delay_ms))
                            .await;
                    }
                }
            }
        }

        if last.is_none() {
            warn!(attempts, "No position fix after all attempts");
        }
        last
    }
}

impl std::fmt::Debug for GeoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoProvider")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of readings; `None` entries never resolve.
    struct ScriptedSensor {
        script: Mutex<VecDeque<Option<Result<Position, SensorError>>>>,
        reads: Mutex<u32>,
    }

    impl ScriptedSensor {
        fn new(script: Vec<Option<Result<Position, SensorError>>>) -> Arc<Self> {
            Arc::new(ScriptedSensor {
                script: Mutex::new(script.into()),
                reads: Mutex::new(0),
            })
        }

        fn reads(&self) -> u32 {
            *self.reads.lock().unwrap()
        }
    }

    #[async_trait]
    impl LocationSensor for ScriptedSensor {
        async fn read(&self) -> Result<Position, SensorError> {
            *self.reads.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Some(result)) => result,
                Some(None) => std::future::pending().await,
                None => Err(SensorError::Unavailable("script exhausted".into())),
            }
        }
    }

    fn fix(accuracy: f64) -> Option<Result<Position, SensorError>> {
        Some(Ok(Position::new(-7.0379, 110.4799, Some(accuracy))))
    }

    fn failure() -> Option<Result<Position, SensorError>> {
        Some(Err(SensorError::Unavailable("no fix".into())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_accurate_reading() {
        let sensor = ScriptedSensor::new(vec![fix(120.0), fix(30.0), fix(5.0)]);
        let geo = GeoProvider::new(sensor.clone(), GeoSettings::default());

        let pos = geo.acquire().await.unwrap();
        assert_eq!(pos.accuracy, Some(30.0));
        assert_eq!(sensor.reads(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_last_reading() {
        let sensor = ScriptedSensor::new(vec![fix(300.0), failure(), fix(200.0), failure()]);
        let geo = GeoProvider::new(sensor.clone(), GeoSettings::default());

        let pos = geo.acquire().await.unwrap();
        assert_eq!(pos.accuracy, Some(200.0));
        assert_eq!(sensor.reads(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_without_any_reading() {
        let sensor = ScriptedSensor::new(vec![failure(), None, failure(), failure()]);
        let geo = GeoProvider::new(sensor.clone(), GeoSettings::default());

        assert!(geo.acquire().await.is_none());
        assert_eq!(sensor.reads(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_origin_reading_counts_as_failure() {
        let sensor = ScriptedSensor::new(vec![
            Some(Ok(Position::new(0.0, 0.0, Some(5.0)))),
            failure(),
            failure(),
            failure(),
        ]);
        let geo = GeoProvider::new(sensor, GeoSettings::default());
        assert!(geo.acquire().await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_sensor() {
        let geo = GeoProvider::new(
            Arc::new(UnavailableSensor),
            GeoSettings {
                max_attempts: 1,
                ..Default::default()
            },
        );
        assert!(geo.acquire().await.is_none());
    }

    #[tokio::test]
    async fn test_static_sensor_without_accuracy() {
        let geo = GeoProvider::new(
            Arc::new(StaticSensor(Position::new(-7.0, 110.0, None))),
            GeoSettings {
                max_attempts: 1,
                ..Default::default()
            },
        );
        let pos = geo.acquire().await.unwrap();
        assert_eq!(pos.accuracy, None);
    }
}
