//! # Attendance Sync Engine
//!
//! Captures geolocated check-in/check-out actions, gates them on accuracy
//! and the office geofence, submits them, and keeps whatever could not be
//! confirmed in the durable pending queue until a drain uploads it.
//!
//! ## Per-slot State Machine (kind × date)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Unattempted ──► Submitting ──┬──► Confirmed                           │
//! │                               │                                         │
//! │                               └──► Queued ──► Retrying ──┬─► Confirmed │
//! │                                                           ├─► Resolved  │
//! │                                                           └─► Abandoned │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submit Path
//! ```text
//!   caller coords (valid?) ─► GeoProvider ─► office centre (degraded)
//!          │
//!          ▼
//!   distance to office (always attached)
//!          │
//!          ├── accuracy > max acceptable ──► queue, Ok(Queued{LowAccuracy})
//!          ├── outside geofence ───────────► queue, Err(OutsideGeofence)
//!          ▼
//!   transport.submit (timeout)
//!          ├── ok ────► mark local time, notify, drop stale duplicates
//!          ├── server refusal ─────────────► Err(Rejected)
//!          └── failure ─► submit_decision: Queue ─► Ok(Queued{Deferred})
//!                                          Propagate ─► Err
//! ```
//!
//! ## Drain Path
//! ```text
//!   already running? ─► skip   inside rate-limit window? ─► defer once
//!          │
//!   for entry in queue (insertion order)
//!          ├── malformed ──────────────────► remove
//!          ├── retries >= max ─────────────► remove, notify Abandoned
//!          └── upload
//!                ├── ok ───────────────────► remove, mark time, pause
//!                ├── 409 ──────────────────► remove (Conflict)
//!                ├── other 4xx ────────────► remove (Rejected)
//!                └── network / 5xx ────────► retries+1, backoff
//! ```

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use presensi_core::geofence::{distance_from_office, is_inside_geofence, is_valid_coordinate};
use presensi_core::policy::{backoff_ms, drain_decision, is_exhausted, submit_decision};
use presensi_core::time::format_local_time;
use presensi_core::validation::validate_geofence;
use presensi_core::{
    AttendanceEvent, AttendanceKind, Coordinates, DailyAttendanceRecord, DrainDecision,
    LocalAttendanceTimes, OfficeGeofence, Position, RemovalReason, SubmitDecision,
};
use presensi_db::{AttendanceTimesRepository, Database, PendingQueueRepository, SettingsRepository};

use crate::api::{AttendanceTransport, SubmitForm};
use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::geo::GeoProvider;
use crate::notifier::{AttendanceChange, ChangeNotifier, QueueReason};
use crate::response::SubmitResponse;
use crate::scheduler::{DrainScheduler, ScheduleOutcome};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a synchronous check-in/check-out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The backend accepted the action. `time` is the local `HH:MM`.
    Confirmed {
        kind: AttendanceKind,
        date: NaiveDate,
        time: String,
        message: Option<String>,
    },
    /// Stored for a later drain. `id` is `None` if persisting failed.
    Queued {
        id: Option<String>,
        reason: QueueReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    /// Too soon after the previous drain; one deferred drain was scheduled.
    RateLimited,
}

/// What one drain pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub uploaded: u32,
    /// Removed because the server already had the record (409).
    pub resolved: u32,
    /// Removed because the server rejected it or it was malformed.
    pub dropped: u32,
    pub abandoned: u32,
    pub retried: u32,
    pub skipped: Option<SkipReason>,
}

impl DrainReport {
    fn skipped(reason: SkipReason) -> Self {
        DrainReport {
            skipped: Some(reason),
            ..Default::default()
        }
    }

    /// Entries that left the queue during this pass.
    pub fn removed(&self) -> u32 {
        self.uploaded + self.resolved + self.dropped + self.abandoned
    }

    pub fn is_empty(&self) -> bool {
        self.removed() == 0 && self.retried == 0
    }
}

/// Resets the reentrancy flag when a drain ends, however it ends.
struct DrainFlag<'a>(&'a AtomicBool);

impl Drop for DrainFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Tunables copied out of [`ClientConfig`] at construction.
#[derive(Debug, Clone)]
struct EngineSettings {
    max_retries: u32,
    inter_entry_pause: Duration,
    backoff_step_ms: u64,
    backoff_cap_ms: u64,
    reconnect_delay: Duration,
    queue_drain_delay: Duration,
    max_acceptable_accuracy_m: f64,
    request_timeout: Duration,
    default_status: String,
}

impl EngineSettings {
    fn from_config(config: &ClientConfig) -> Self {
        EngineSettings {
            max_retries: config.sync.max_retries,
            inter_entry_pause: Duration::from_millis(config.sync.inter_entry_pause_ms),
            backoff_step_ms: config.sync.backoff_step_ms,
            backoff_cap_ms: config.sync.backoff_cap_ms,
            reconnect_delay: Duration::from_millis(config.sync.reconnect_delay_ms),
            queue_drain_delay: Duration::from_millis(config.sync.queue_drain_delay_ms),
            max_acceptable_accuracy_m: config.geo.max_acceptable_accuracy_m,
            request_timeout: config.api.timeout(),
            default_status: config.sync.default_status.clone(),
        }
    }
}

struct Inner {
    queue: PendingQueueRepository,
    settings: SettingsRepository,
    times: AttendanceTimesRepository,
    geo: GeoProvider,
    transport: Arc<dyn AttendanceTransport>,
    notifier: ChangeNotifier,
    scheduler: DrainScheduler,
    fence: RwLock<OfficeGeofence>,
    draining: AtomicBool,
    tuning: EngineSettings,
}

/// The offline-tolerant attendance core. Cheap to clone.
#[derive(Clone)]
pub struct AttendanceSyncEngine {
    inner: Arc<Inner>,
}

impl AttendanceSyncEngine {
    /// Builds an engine using the `[office]` fence from `config`. Call
    /// [`load_persisted_fence`](Self::load_persisted_fence) afterwards to
    /// pick up a fence saved in settings.
    pub fn new(
        db: &Database,
        geo: GeoProvider,
        transport: Arc<dyn AttendanceTransport>,
        config: &ClientConfig,
    ) -> Self {
        let tuning = EngineSettings::from_config(config);
        let scheduler =
            DrainScheduler::new(Duration::from_millis(config.sync.min_drain_interval_ms));

        AttendanceSyncEngine {
            inner: Arc::new(Inner {
                queue: db.pending_queue(),
                settings: db.settings(),
                times: db.attendance_times(),
                geo,
                transport,
                notifier: ChangeNotifier::default(),
                scheduler,
                fence: RwLock::new(config.office_geofence()),
                draining: AtomicBool::new(false),
                tuning,
            }),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Current office geofence.
    pub fn fence(&self) -> OfficeGeofence {
        *self
            .inner
            .fence
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the in-memory geofence.
    pub fn reconfigure(&self, fence: OfficeGeofence) -> SyncResult<()> {
        validate_geofence(&fence)?;
        info!(
            latitude = fence.latitude,
            longitude = fence.longitude,
            radius = fence.radius_meters,
            "Office geofence reconfigured"
        );
        *self
            .inner
            .fence
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fence;
        Ok(())
    }

    /// Persists `fence` and applies it.
    pub async fn save_office_geofence(&self, fence: OfficeGeofence) -> SyncResult<()> {
        validate_geofence(&fence)?;
        self.inner.settings.save_office_geofence(&fence).await?;
        self.reconfigure(fence)
    }

    /// Applies the fence saved in settings, if there is a usable one.
    pub async fn load_persisted_fence(&self) -> OfficeGeofence {
        match self.inner.settings.office_geofence().await {
            Ok(Some(fence)) if validate_geofence(&fence).is_ok() => {
                if let Err(e) = self.reconfigure(fence) {
                    warn!(error = %e, "Ignoring persisted office geofence");
                }
            }
            Ok(Some(_)) => warn!("Persisted office geofence is invalid, keeping defaults"),
            Ok(None) => debug!("No persisted office geofence, using configured one"),
            Err(e) => warn!(error = %e, "Failed to read persisted office geofence"),
        }
        self.fence()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AttendanceChange> {
        self.inner.notifier.subscribe()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Local calendar day.
    pub fn today_date() -> NaiveDate {
        Local::now().date_naive()
    }

    pub async fn pending(&self) -> SyncResult<Vec<AttendanceEvent>> {
        Ok(self.inner.queue.list().await?)
    }

    pub async fn pending_count(&self) -> SyncResult<i64> {
        Ok(self.inner.queue.count().await?)
    }

    pub async fn local_times(&self, date: NaiveDate) -> SyncResult<LocalAttendanceTimes> {
        Ok(self.inner.times.get(date).await?)
    }

    /// Today's times: the local projection wins, server records for today
    /// fill whatever it lacks.
    pub async fn today(&self, server: &[DailyAttendanceRecord]) -> SyncResult<LocalAttendanceTimes> {
        let date = Self::today_date();
        let mut times = self.inner.times.get(date).await?;

        if let Some(record) = server.iter().find(|r| r.belongs_to(date)) {
            for (kind, raw) in [
                (AttendanceKind::CheckIn, &record.check_in),
                (AttendanceKind::CheckOut, &record.check_out),
            ] {
                if times.get(kind).is_none() {
                    times.set(kind, raw.as_deref().and_then(format_local_time));
                }
            }
        }
        Ok(times)
    }

    // =========================================================================
    // Synchronous Submit
    // =========================================================================

    pub async fn check_in(&self, coords: Option<Coordinates>) -> SyncResult<SubmitOutcome> {
        self.submit_attendance(AttendanceKind::CheckIn, coords).await
    }

    pub async fn check_out(&self, coords: Option<Coordinates>) -> SyncResult<SubmitOutcome> {
        self.submit_attendance(AttendanceKind::CheckOut, coords).await
    }

    #[instrument(skip(self, coords), fields(kind = %kind))]
    pub async fn submit_attendance(
        &self,
        kind: AttendanceKind,
        coords: Option<Coordinates>,
    ) -> SyncResult<SubmitOutcome> {
        let date = Self::today_date();
        let fence = self.fence();
        let position = self.resolve_position(coords, &fence).await;
        let distance = distance_from_office(position.coordinates(), &fence);

        let event = AttendanceEvent::new(kind, date, position, self.inner.tuning.default_status.clone())
            .with_distance(Some(distance));

        if let Some(accuracy) = position.accuracy {
            if accuracy > self.inner.tuning.max_acceptable_accuracy_m {
                warn!(
                    accuracy,
                    max = self.inner.tuning.max_acceptable_accuracy_m,
                    "Position too coarse, queuing instead of submitting"
                );
                let id = self.enqueue(event, QueueReason::LowAccuracy).await;
                return Ok(SubmitOutcome::Queued {
                    id,
                    reason: QueueReason::LowAccuracy,
                });
            }
        }

        if !is_inside_geofence(position.latitude, position.longitude, &fence) {
            warn!(
                distance,
                radius = fence.radius_meters,
                "Outside office geofence, queuing"
            );
            let queued_id = self.enqueue(event, QueueReason::OutsideGeofence).await;
            return Err(SyncError::OutsideGeofence {
                distance,
                radius: fence.radius_meters,
                queued_id,
            });
        }

        let form = SubmitForm::from_event(&event, self.user_id().await);
        match self.send(kind, &form).await {
            Ok(response) => {
                if let Some(rejection) = response.rejection() {
                    warn!(message = %rejection.message, "Attendance refused by server");
                    return Err(SyncError::Rejected {
                        message: rejection.message,
                        distance: rejection.distance,
                        allowed_radius: rejection.allowed_radius,
                    });
                }

                let time = self.record_confirmed(kind, date, &response).await;
                match self.inner.queue.remove_by_type_and_date(kind, date).await {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Dropped stale queued duplicates"),
                    Err(e) => warn!(error = %e, "Failed to drop stale queued duplicates"),
                }

                info!(time = %time, "Attendance confirmed");
                Ok(SubmitOutcome::Confirmed {
                    kind,
                    date,
                    time,
                    message: response.message,
                })
            }
            Err(err) => {
                let Some(failure) = err.failure_kind() else {
                    return Err(err);
                };
                match submit_decision(&failure) {
                    SubmitDecision::Queue => {
                        warn!(failure = %failure, "Submit failed, queuing for later");
                        let id = self.enqueue(event, QueueReason::Deferred).await;
                        Ok(SubmitOutcome::Queued {
                            id,
                            reason: QueueReason::Deferred,
                        })
                    }
                    SubmitDecision::Propagate => {
                        debug!(failure = %failure, "Submit failed, surfacing to caller");
                        if failure.status() == Some(409) {
                            Err(SyncError::AlreadyRecorded(err.user_message()))
                        } else {
                            Err(err)
                        }
                    }
                }
            }
        }
    }

    /// Caller coordinates if valid, else a sensor fix, else the office
    /// centre.
    async fn resolve_position(&self, coords: Option<Coordinates>, fence: &OfficeGeofence) -> Position {
        if let Some(c) = coords {
            if is_valid_coordinate(c.latitude, c.longitude) {
                return Position::from(c);
            }
            warn!(
                latitude = c.latitude,
                longitude = c.longitude,
                "Ignoring invalid caller coordinates"
            );
        }

        if let Some(position) = self.inner.geo.acquire().await {
            return position;
        }

        warn!("No position fix, falling back to office coordinates");
        Position::from(fence.center())
    }

    async fn user_id(&self) -> Option<i64> {
        self.inner.settings.user_id().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read user id");
            None
        })
    }

    async fn send(&self, kind: AttendanceKind, form: &SubmitForm) -> SyncResult<SubmitResponse> {
        let timeout = self.inner.tuning.request_timeout;
        match tokio::time::timeout(timeout, self.inner.transport.submit(kind, form)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Marks the local projection and notifies. Returns the `HH:MM` stored.
    async fn record_confirmed(
        &self,
        kind: AttendanceKind,
        date: NaiveDate,
        response: &SubmitResponse,
    ) -> String {
        let time = response
            .time_for(kind)
            .and_then(format_local_time)
            .unwrap_or_else(|| Local::now().format("%H:%M").to_string());

        if let Err(e) = self.inner.times.mark(date, kind, &time).await {
            error!(error = %e, "Failed to store local attendance time");
        }
        self.inner
            .notifier
            .notify(AttendanceChange::Confirmed { kind, date });
        time
    }

    /// Persists `event`, notifies and schedules a drain. `None` when the
    /// queue could not be written.
    async fn enqueue(&self, event: AttendanceEvent, reason: QueueReason) -> Option<String> {
        let (kind, date) = (event.kind, event.date);
        match self.inner.queue.append(event).await {
            Ok(id) => {
                info!(id = %id, reason = %reason, "Attendance queued");
                self.inner.notifier.notify(AttendanceChange::Queued {
                    id: id.clone(),
                    kind,
                    date,
                    reason,
                });
                self.schedule_drain(self.inner.tuning.queue_drain_delay);
                Some(id)
            }
            Err(e) => {
                error!(error = %e, reason = %reason, "Failed to persist attendance, not queued");
                None
            }
        }
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Schedules a drain after `delay`, coalescing with any pending one.
    pub fn schedule_drain(&self, delay: Duration) -> ScheduleOutcome {
        let engine = self.clone();
        self.inner.scheduler.schedule(delay, async move {
            let report = engine.drain_queue().await;
            debug!(?report, "Scheduled drain finished");
        })
    }

    pub fn cancel_scheduled_drain(&self) -> bool {
        self.inner.scheduler.cancel()
    }

    pub fn is_drain_scheduled(&self) -> bool {
        self.inner.scheduler.is_scheduled()
    }

    /// Connectivity came back.
    pub fn notify_online(&self) -> ScheduleOutcome {
        info!("Back online, scheduling drain");
        self.schedule_drain(self.inner.tuning.reconnect_delay)
    }

    /// Uploads every queued entry once. Never fails; problems are logged and
    /// reflected in the report.
    pub async fn drain_queue(&self) -> DrainReport {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already running");
            return DrainReport::skipped(SkipReason::AlreadyRunning);
        }
        let _flag = DrainFlag(&self.inner.draining);

        if let Some(remaining) = self.inner.scheduler.window_remaining() {
            debug!(remaining_ms = remaining.as_millis() as u64, "Drain rate limited, deferring");
            self.schedule_drain(Duration::ZERO);
            return DrainReport::skipped(SkipReason::RateLimited);
        }

        self.inner.scheduler.mark_drained();
        let report = self.drain_entries().await;
        if !report.is_empty() {
            info!(
                uploaded = report.uploaded,
                resolved = report.resolved,
                dropped = report.dropped,
                abandoned = report.abandoned,
                retried = report.retried,
                "Drain finished"
            );
        }
        report
    }

    async fn drain_entries(&self) -> DrainReport {
        let mut report = DrainReport::default();

        match self.inner.queue.purge_undecodable().await {
            Ok(purged) => {
                for id in purged {
                    report.dropped += 1;
                    self.inner.notifier.notify(AttendanceChange::Discarded { id });
                }
            }
            Err(e) => error!(error = %e, "Failed to purge undecodable pending entries"),
        }

        let entries = match self.inner.queue.list().await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to read pending queue, treating as empty");
                return report;
            }
        };
        if entries.is_empty() {
            debug!("No pending attendance");
            return report;
        }

        debug!(count = entries.len(), "Draining pending attendance");
        let fence = self.fence();
        let user_id = self.user_id().await;
        let tuning = &self.inner.tuning;

        for mut entry in entries {
            if entry.is_malformed() {
                warn!("Removing malformed pending entry");
                self.remove(&entry.id).await;
                report.dropped += 1;
                self.inner.notifier.notify(AttendanceChange::Resolved {
                    id: entry.id,
                    kind: entry.kind,
                    date: entry.date,
                    reason: RemovalReason::Malformed,
                });
                continue;
            }

            if is_exhausted(entry.retries, tuning.max_retries) {
                warn!(id = %entry.id, retries = entry.retries, "Giving up on pending entry");
                self.remove(&entry.id).await;
                report.abandoned += 1;
                self.inner.notifier.notify(AttendanceChange::Abandoned {
                    id: entry.id,
                    kind: entry.kind,
                    date: entry.date,
                });
                continue;
            }

            if entry.distance.is_none() && fence.is_configured() {
                entry.distance = Some(distance_from_office(entry.position().coordinates(), &fence));
            }

            let form = SubmitForm::from_event(&entry, user_id);
            let result = self.send(entry.kind, &form).await.and_then(|response| {
                match response.rejection() {
                    Some(r) => Err(SyncError::Rejected {
                        message: r.message,
                        distance: r.distance,
                        allowed_radius: r.allowed_radius,
                    }),
                    None => Ok(response),
                }
            });

            let err = match result {
                Ok(response) => {
                    debug!(id = %entry.id, "Uploaded pending entry");
                    self.remove(&entry.id).await;
                    self.record_confirmed(entry.kind, entry.date, &response).await;
                    report.uploaded += 1;
                    tokio::time::sleep(tuning.inter_entry_pause).await;
                    continue;
                }
                Err(err) => err,
            };

            if matches!(err, SyncError::NotAuthenticated) {
                warn!("Not logged in, stopping drain");
                break;
            }

            let decision = match err.failure_kind() {
                Some(failure) => drain_decision(&failure),
                None if matches!(err, SyncError::Rejected { .. }) => {
                    DrainDecision::Remove(RemovalReason::Rejected)
                }
                None => DrainDecision::Retry,
            };

            match decision {
                DrainDecision::Remove(reason) => {
                    warn!(id = %entry.id, reason = %reason, error = %err, "Removing pending entry");
                    self.remove(&entry.id).await;
                    match reason {
                        RemovalReason::Conflict => report.resolved += 1,
                        _ => report.dropped += 1,
                    }
                    self.inner.notifier.notify(AttendanceChange::Resolved {
                        id: entry.id,
                        kind: entry.kind,
                        date: entry.date,
                        reason,
                    });
                    tokio::time::sleep(tuning.inter_entry_pause).await;
                }
                DrainDecision::Retry => {
                    entry.record_failed_attempt(Utc::now());
                    if let Err(e) = self.inner.queue.update_by_id(&entry).await {
                        error!(id = %entry.id, error = %e, "Failed to persist retry count");
                    }
                    report.retried += 1;

                    let backoff = backoff_ms(entry.retries, tuning.backoff_step_ms, tuning.backoff_cap_ms);
                    debug!(
                        id = %entry.id,
                        retries = entry.retries,
                        backoff_ms = backoff,
                        error = %err,
                        "Upload failed, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
            }
        }

        report
    }

    async fn remove(&self, id: &str) {
        if let Err(e) = self.inner.queue.remove_by_id(id).await {
            error!(id = %id, error = %e, "Failed to remove pending entry");
        }
    }
}

impl std::fmt::Debug for AttendanceSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendanceSyncEngine")
            .field("fence", &self.fence())
            .field("draining", &self.inner.draining.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{StaticSensor, UnavailableSensor};
    use crate::geo::LocationSensor;
    use async_trait::async_trait;
    use presensi_core::geofence::EARTH_RADIUS_M;
    use presensi_db::DbConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::broadcast::error::TryRecvError;

    const OFFICE: OfficeGeofence = OfficeGeofence::new(-7.037943980089189, 110.47993371532893, 500.0);

    /// Replays scripted results; once the script runs out every submit
    /// succeeds.
    #[derive(Default)]
    struct FakeTransport {
        script: Mutex<VecDeque<SyncResult<SubmitResponse>>>,
        calls: Mutex<Vec<(AttendanceKind, SubmitForm)>>,
    }

    impl FakeTransport {
        fn with(script: Vec<SyncResult<SubmitResponse>>) -> Arc<Self> {
            Arc::new(FakeTransport {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(AttendanceKind, SubmitForm)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AttendanceTransport for FakeTransport {
        async fn submit(&self, kind: AttendanceKind, form: &SubmitForm) -> SyncResult<SubmitResponse> {
            self.calls.lock().unwrap().push((kind, form.clone()));
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                Ok(SubmitResponse {
                    check_in: Some("08:01:00".into()),
                    check_out: Some("17:02:00".into()),
                    message: Some("OK".into()),
                    ..Default::default()
                })
            })
        }
    }

    fn http(status: u16) -> SyncError {
        SyncError::Http {
            status,
            message: format!("status {status}"),
        }
    }

    /// A point `meters` due north of the office.
    fn north(meters: f64) -> Coordinates {
        Coordinates::new(OFFICE.latitude + (meters / EARTH_RADIUS_M).to_degrees(), OFFICE.longitude)
    }

    fn test_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.geo.max_attempts = 1;
        config.sync.min_drain_interval_ms = 40;
        config.sync.inter_entry_pause_ms = 1;
        config.sync.backoff_step_ms = 5;
        config.sync.backoff_cap_ms = 20;
        config.sync.queue_drain_delay_ms = 60_000;
        config.sync.reconnect_delay_ms = 10;
        config
    }

    async fn engine_with(
        sensor: Arc<dyn LocationSensor>,
        transport: Arc<FakeTransport>,
    ) -> (AttendanceSyncEngine, Database) {
        engine_with_config(sensor, transport, test_config()).await
    }

    async fn engine_with_config(
        sensor: Arc<dyn LocationSensor>,
        transport: Arc<FakeTransport>,
        config: ClientConfig,
    ) -> (AttendanceSyncEngine, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let geo = GeoProvider::new(sensor, config.geo.clone());
        let engine = AttendanceSyncEngine::new(&db, geo, transport, &config);
        (engine, db)
    }

    async fn queue_entry(db: &Database, kind: AttendanceKind, retries: u32) -> String {
        let mut event = AttendanceEvent::new(
            kind,
            AttendanceSyncEngine::today_date(),
            Position::from(OFFICE.center()),
            "Present",
        );
        event.retries = retries;
        db.pending_queue().append(event).await.unwrap()
    }

    async fn wait_out_window() {
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    // -------------------------------------------------------------------------
    // Submit path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_successful_check_in() {
        let transport = FakeTransport::with(vec![]);
        let sensor = Arc::new(StaticSensor(Position::new(OFFICE.latitude, OFFICE.longitude, Some(10.0))));
        let (engine, db) = engine_with(sensor, transport.clone()).await;
        let mut changes = engine.subscribe();

        let outcome = engine.check_in(None).await.unwrap();
        let today = AttendanceSyncEngine::today_date();
        assert!(matches!(
            outcome,
            SubmitOutcome::Confirmed { kind: AttendanceKind::CheckIn, date, ref time, .. }
                if date == today && time == "08:01"
        ));

        let times = engine.local_times(today).await.unwrap();
        assert_eq!(times.check_in.as_deref(), Some("08:01"));
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);

        assert!(matches!(changes.try_recv(), Ok(AttendanceChange::Confirmed { .. })));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.distance, Some(0.0));
        assert_eq!(calls[0].1.accuracy, Some(10.0));
        assert_eq!(calls[0].1.status, "Present");
    }

    #[tokio::test]
    async fn test_outside_geofence_queues_and_fails() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;

        let result = engine.check_in(Some(north(1000.0))).await;
        engine.cancel_scheduled_drain();

        let queued_id = match result {
            Err(SyncError::OutsideGeofence { distance, radius, queued_id }) => {
                assert_eq!(distance, 1000.0);
                assert_eq!(radius, 500.0);
                queued_id.unwrap()
            }
            other => panic!("unexpected {other:?}"),
        };

        let queued = db.pending_queue().list().await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, queued_id);
        assert_eq!(queued[0].distance, Some(1000.0));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_low_accuracy_is_queued() {
        let transport = FakeTransport::with(vec![]);
        let sensor = Arc::new(StaticSensor(Position::new(OFFICE.latitude, OFFICE.longitude, Some(2500.0))));
        let (engine, db) = engine_with(sensor, transport.clone()).await;

        let outcome = engine.check_out(None).await.unwrap();
        engine.cancel_scheduled_drain();

        assert!(matches!(
            outcome,
            SubmitOutcome::Queued { id: Some(_), reason: QueueReason::LowAccuracy }
        ));
        assert_eq!(db.pending_queue().count().await.unwrap(), 1);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_fix_falls_back_to_office() {
        let transport = FakeTransport::with(vec![]);
        let (engine, _db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;

        let outcome = engine.check_in(Some(Coordinates::new(0.0, 0.0))).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Confirmed { .. }));

        let form = &transport.calls()[0].1;
        assert_eq!(form.latitude, OFFICE.latitude);
        assert_eq!(form.longitude, OFFICE.longitude);
        assert_eq!(form.accuracy, None);
    }

    #[tokio::test]
    async fn test_network_failure_is_queued() {
        let transport = FakeTransport::with(vec![Err(SyncError::Network("offline".into()))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        let mut changes = engine.subscribe();

        let outcome = engine.check_in(Some(north(10.0))).await.unwrap();
        assert!(engine.is_drain_scheduled());
        engine.cancel_scheduled_drain();

        assert!(matches!(
            outcome,
            SubmitOutcome::Queued { id: Some(_), reason: QueueReason::Deferred }
        ));
        assert_eq!(db.pending_queue().count().await.unwrap(), 1);
        assert!(matches!(changes.try_recv(), Ok(AttendanceChange::Queued { .. })));
    }

    #[tokio::test]
    async fn test_forbidden_is_queued() {
        let transport = FakeTransport::with(vec![Err(http(403))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        let outcome = engine.check_in(Some(north(10.0))).await.unwrap();
        engine.cancel_scheduled_drain();
        assert!(matches!(outcome, SubmitOutcome::Queued { .. }));
        assert_eq!(db.pending_queue().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_validation_error_propagates() {
        let transport = FakeTransport::with(vec![Err(SyncError::Validation {
            message: "The status field is required.".into(),
            fields: Default::default(),
        })]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        let result = engine.check_in(Some(north(10.0))).await;
        assert!(matches!(result, Err(SyncError::Validation { .. })));
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
        assert!(!engine.is_drain_scheduled());
    }

    #[tokio::test]
    async fn test_conflict_on_submit_is_already_recorded() {
        let transport = FakeTransport::with(vec![Err(http(409))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        let result = engine.check_out(Some(north(10.0))).await;
        assert!(matches!(result, Err(SyncError::AlreadyRecorded(_))));
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_server_refusal_is_rejected() {
        let transport = FakeTransport::with(vec![Ok(SubmitResponse {
            message: Some("Di luar area kantor".into()),
            distance: Some(812.0),
            allowed_radius: Some(500.0),
            ..Default::default()
        })]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        let result = engine.check_in(Some(north(10.0))).await;
        match result {
            Err(SyncError::Rejected { message, allowed_radius, .. }) => {
                assert_eq!(message, "Di luar area kantor");
                assert_eq!(allowed_radius, Some(500.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
        assert!(engine.local_times(AttendanceSyncEngine::today_date()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_removes_stale_duplicate() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;
        queue_entry(&db, AttendanceKind::CheckOut, 0).await;

        engine.check_in(Some(north(10.0))).await.unwrap();

        let left = db.pending_queue().list().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].kind, AttendanceKind::CheckOut);
    }

    // -------------------------------------------------------------------------
    // Drain path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_conflict_on_drain_resolves() {
        let transport = FakeTransport::with(vec![Err(http(409))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;
        let id = queue_entry(&db, AttendanceKind::CheckIn, 0).await;
        let mut changes = engine.subscribe();

        let report = engine.drain_queue().await;
        assert_eq!(report.resolved, 1);
        assert_eq!(report.retried, 0);
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
        assert_eq!(transport.calls().len(), 1);

        match changes.try_recv() {
            Ok(AttendanceChange::Resolved { id: got, reason, .. }) => {
                assert_eq!(got, id);
                assert_eq!(reason, RemovalReason::Conflict);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_error_on_drain_drops() {
        let transport = FakeTransport::with(vec![Err(http(422))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        queue_entry(&db, AttendanceKind::CheckOut, 0).await;

        let report = engine.drain_queue().await;
        assert_eq!(report.dropped, 1);
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_then_recovery() {
        let transport = FakeTransport::with(vec![Err(SyncError::Network("offline".into()))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;
        let id = queue_entry(&db, AttendanceKind::CheckIn, 0).await;

        let report = engine.drain_queue().await;
        assert_eq!(report.retried, 1);
        let entry = db.pending_queue().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entry.retries, 1);
        assert!(entry.last_attempt.is_some());
        assert_eq!(backoff_ms(entry.retries, 2000, 10_000), 2000);

        wait_out_window().await;
        let report = engine.drain_queue().await;
        assert_eq!(report.uploaded, 1);
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);

        let times = engine.local_times(AttendanceSyncEngine::today_date()).await.unwrap();
        assert_eq!(times.check_in.as_deref(), Some("08:01"));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_on_drain_retries() {
        let transport = FakeTransport::with(vec![Err(http(503)), Err(SyncError::Timeout(15_000))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;
        queue_entry(&db, AttendanceKind::CheckOut, 1).await;

        let report = engine.drain_queue().await;
        assert_eq!(report.retried, 2);

        let retries: Vec<u32> = db
            .pending_queue()
            .list()
            .await
            .unwrap()
            .iter()
            .map(|e| e.retries)
            .collect();
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_drain_backs_off_after_each_retry() {
        let transport = FakeTransport::with(vec![Err(http(503)), Err(http(502))]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        queue_entry(&db, AttendanceKind::CheckIn, 2).await;
        queue_entry(&db, AttendanceKind::CheckOut, 2).await;

        // retries 2 -> 3 on both entries: min(5 * 3, 20) = 15 ms each
        let started = std::time::Instant::now();
        let report = engine.drain_queue().await;
        assert_eq!(report.retried, 2);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_drain_pauses_between_entries() {
        let mut config = test_config();
        config.sync.inter_entry_pause_ms = 25;
        let transport = FakeTransport::with(vec![Err(http(409))]);
        let (engine, db) = engine_with_config(Arc::new(UnavailableSensor), transport, config).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;
        queue_entry(&db, AttendanceKind::CheckOut, 0).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;

        let started = std::time::Instant::now();
        let report = engine.drain_queue().await;
        assert_eq!(report.resolved, 1);
        assert_eq!(report.uploaded, 2);
        assert!(started.elapsed() >= Duration::from_millis(75));
    }

    #[tokio::test]
    async fn test_drain_purges_undecodable_rows() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;
        sqlx::query(
            "INSERT INTO pending_attendance (id, kind, date, latitude, longitude, status) \
             VALUES ('corrupt', 'check-out', 'not-a-date', 0, 0, 'Present')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        assert_eq!(engine.pending_count().await.unwrap(), 2);
        let mut changes = engine.subscribe();

        let report = engine.drain_queue().await;
        assert_eq!(report.dropped, 1);
        assert_eq!(report.uploaded, 1);
        assert_eq!(engine.pending_count().await.unwrap(), 0);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(
            changes.try_recv().unwrap(),
            AttendanceChange::Discarded { id: "corrupt".into() }
        );
    }

    #[tokio::test]
    async fn test_exhausted_entry_abandoned_without_upload() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;
        queue_entry(&db, AttendanceKind::CheckIn, 3).await;
        let mut changes = engine.subscribe();

        let report = engine.drain_queue().await;
        assert_eq!(report.abandoned, 1);
        assert!(transport.calls().is_empty());
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
        assert!(matches!(changes.try_recv(), Ok(AttendanceChange::Abandoned { .. })));
    }

    #[tokio::test]
    async fn test_drain_computes_missing_distance() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;
        let event = AttendanceEvent::new(
            AttendanceKind::CheckIn,
            AttendanceSyncEngine::today_date(),
            Position::from(north(250.0)),
            "Present",
        );
        db.pending_queue().append(event).await.unwrap();

        engine.drain_queue().await;
        assert_eq!(transport.calls()[0].1.distance, Some(250.0));
    }

    #[tokio::test]
    async fn test_drain_rate_limited() {
        let transport = FakeTransport::with(vec![]);
        let (engine, _db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        let first = engine.drain_queue().await;
        assert_eq!(first.skipped, None);

        let second = engine.drain_queue().await;
        assert_eq!(second.skipped, Some(SkipReason::RateLimited));
        assert!(engine.is_drain_scheduled());

        // a burst of requests still yields a single deferred drain
        assert_eq!(engine.drain_queue().await.skipped, Some(SkipReason::RateLimited));
        engine.cancel_scheduled_drain();
    }

    #[tokio::test]
    async fn test_drain_reentrancy_guard() {
        let transport = FakeTransport::with(vec![]);
        let (engine, _db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        engine.inner.draining.store(true, Ordering::SeqCst);
        let report = engine.drain_queue().await;
        assert_eq!(report.skipped, Some(SkipReason::AlreadyRunning));

        engine.inner.draining.store(false, Ordering::SeqCst);
        assert_eq!(engine.drain_queue().await.skipped, None);
        assert!(!engine.inner.draining.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_scheduled_drain_runs() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;

        engine.notify_online();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(db.pending_queue().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_not_logged_in_stops_drain() {
        let transport = FakeTransport::with(vec![Err(SyncError::NotAuthenticated)]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport.clone()).await;
        queue_entry(&db, AttendanceKind::CheckIn, 0).await;
        queue_entry(&db, AttendanceKind::CheckOut, 0).await;

        let report = engine.drain_queue().await;
        assert!(report.is_empty());
        assert_eq!(transport.calls().len(), 1);
        assert!(db.pending_queue().list().await.unwrap().iter().all(|e| e.retries == 0));
    }

    // -------------------------------------------------------------------------
    // Configuration & reads
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reconfigure_and_persist_fence() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        assert_eq!(engine.fence(), OFFICE);

        let moved = OfficeGeofence::new(-6.2, 106.8, 150.0);
        engine.save_office_geofence(moved).await.unwrap();
        assert_eq!(engine.fence(), moved);
        assert_eq!(db.settings().office_geofence().await.unwrap(), Some(moved));

        assert!(engine.reconfigure(OfficeGeofence::new(0.0, 0.0, 100.0)).is_err());
        assert_eq!(engine.fence(), moved);
    }

    #[tokio::test]
    async fn test_load_persisted_fence() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;

        assert_eq!(engine.load_persisted_fence().await, OFFICE);

        let saved = OfficeGeofence::new(-6.2, 106.8, 150.0);
        db.settings().save_office_geofence(&saved).await.unwrap();
        assert_eq!(engine.load_persisted_fence().await, saved);
    }

    #[tokio::test]
    async fn test_today_prefers_local_projection() {
        let transport = FakeTransport::with(vec![]);
        let (engine, db) = engine_with(Arc::new(UnavailableSensor), transport).await;
        let today = AttendanceSyncEngine::today_date();
        db.attendance_times()
            .mark(today, AttendanceKind::CheckIn, "07:58")
            .await
            .unwrap();

        let server = vec![DailyAttendanceRecord {
            date: Some(presensi_core::time::date_key(today)),
            check_in: Some("08:30:00".into()),
            check_out: Some("17.05".into()),
            ..Default::default()
        }];
        let times = engine.today(&server).await.unwrap();
        assert_eq!(times.check_in.as_deref(), Some("07:58"));
        assert_eq!(times.check_out.as_deref(), Some("17:05"));
    }
}
