//! # Sync Agent
//!
//! Background driver for the attendance engine: periodic drains,
//! connectivity transitions, and a status snapshot for the UI.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncAgent Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         SyncAgent                                │  │
//! │  │                                                                  │  │
//! │  │  • Drains the pending queue every poll interval while online    │  │
//! │  │  • Online event ──► engine.notify_online() (reconnect delay)    │  │
//! │  │  • Tracks pending count from AttendanceChange events            │  │
//! │  │  • Emits status to the UI through SyncEventEmitter              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │  interval tick │  │ AgentCommand   │  │ ChangeNotifier         │    │
//! │  │                │  │ (mpsc)         │  │ (broadcast)            │    │
//! │  │ drain_queue()  │  │ connectivity,  │  │ refresh pending count  │    │
//! │  │                │  │ drain now      │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::engine::{AttendanceSyncEngine, DrainReport};
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Sync Status
// =============================================================================

/// Current sync status for external queries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStatus {
    pub running: bool,

    /// Last known connectivity.
    pub online: bool,

    /// Entries waiting in the pending queue.
    pub pending_count: i64,

    /// When the agent last ran a drain.
    pub last_drain: Option<DateTime<Utc>>,

    pub last_report: Option<DrainReport>,
}

/// Connectivity transitions reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives status updates (implemented by the UI integration).
pub trait SyncEventEmitter: Send + Sync {
    fn emit_status(&self, status: &SyncStatus);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
}

// =============================================================================
// Sync Agent
// =============================================================================

enum AgentCommand {
    Connectivity(ConnectivityEvent),
    DrainNow(oneshot::Sender<DrainReport>),
}

pub struct SyncAgent {
    engine: AttendanceSyncEngine,
    poll_interval: Duration,
    status: Arc<RwLock<SyncStatus>>,
    emitter: Arc<dyn SyncEventEmitter>,
    commands: mpsc::Receiver<AgentCommand>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl SyncAgent {
    /// Spawns the agent on the current runtime.
    pub fn spawn(engine: AttendanceSyncEngine, config: &ClientConfig) -> SyncAgentHandle {
        Self::spawn_with_emitter(engine, config, Arc::new(NoOpEmitter))
    }

    pub fn spawn_with_emitter(
        engine: AttendanceSyncEngine,
        config: &ClientConfig,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SyncAgentHandle {
        let (command_tx, commands) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let status = Arc::new(RwLock::new(SyncStatus {
            running: true,
            online: true,
            ..Default::default()
        }));

        let agent = SyncAgent {
            engine,
            poll_interval: Duration::from_secs(config.sync.poll_interval_secs.max(1)),
            status: status.clone(),
            emitter,
            commands,
            shutdown_rx,
        };

        info!(
            poll_interval_secs = agent.poll_interval.as_secs(),
            "Starting sync agent"
        );
        tokio::spawn(agent.run());

        SyncAgentHandle {
            commands: command_tx,
            shutdown_tx,
            status,
        }
    }

    async fn run(mut self) {
        let mut changes = self.engine.subscribe();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.status.read().await.online {
                        self.drain().await;
                    } else {
                        debug!("Offline, skipping scheduled drain");
                    }
                }

                Some(command) = self.commands.recv() => match command {
                    AgentCommand::Connectivity(event) => self.on_connectivity(event).await,
                    AgentCommand::DrainNow(reply) => {
                        let report = self.drain().await;
                        let _ = reply.send(report);
                    }
                },

                change = changes.recv() => match change {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        self.refresh_pending().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Change notifier closed");
                        break;
                    }
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Sync agent received shutdown");
                    break;
                }
            }
        }

        self.engine.cancel_scheduled_drain();
        self.status.write().await.running = false;
        self.emit().await;
        info!("Sync agent stopped");
    }

    async fn on_connectivity(&self, event: ConnectivityEvent) {
        let was_online = {
            let mut status = self.status.write().await;
            let was = status.online;
            status.online = event == ConnectivityEvent::Online;
            was
        };

        match event {
            ConnectivityEvent::Online if !was_online => {
                self.engine.notify_online();
            }
            ConnectivityEvent::Offline if was_online => {
                info!("Connectivity lost");
                self.engine.cancel_scheduled_drain();
            }
            _ => {}
        }
        self.emit().await;
    }

    async fn drain(&self) -> DrainReport {
        let report = self.engine.drain_queue().await;
        if report.skipped.is_none() {
            let mut status = self.status.write().await;
            status.last_drain = Some(Utc::now());
            status.last_report = Some(report.clone());
        }
        self.refresh_pending().await;
        report
    }

    async fn refresh_pending(&self) {
        match self.engine.pending_count().await {
            Ok(count) => self.status.write().await.pending_count = count,
            Err(e) => warn!(error = %e, "Failed to count pending attendance"),
        }
        self.emit().await;
    }

    async fn emit(&self) {
        let status = self.status.read().await.clone();
        self.emitter.emit_status(&status);
    }
}

// =============================================================================
// Agent Handle (for external control)
// =============================================================================

/// Controls a running [`SyncAgent`].
#[derive(Clone)]
pub struct SyncAgentHandle {
    commands: mpsc::Sender<AgentCommand>,
    shutdown_tx: mpsc::Sender<()>,
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncAgentHandle {
    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    pub async fn connectivity(&self, event: ConnectivityEvent) -> SyncResult<()> {
        self.commands
            .send(AgentCommand::Connectivity(event))
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    /// Runs a drain on the agent task and waits for its report.
    pub async fn drain_now(&self) -> SyncResult<DrainReport> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(AgentCommand::DrainNow(reply))
            .await
            .map_err(|_| SyncError::ShuttingDown)?;
        rx.await.map_err(|_| SyncError::ShuttingDown)
    }

    /// Signals the agent to shut down gracefully.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AttendanceTransport, SubmitForm};
    use crate::geo::{GeoProvider, UnavailableSensor};
    use crate::response::SubmitResponse;
    use async_trait::async_trait;
    use presensi_core::{AttendanceEvent, AttendanceKind, Position};
    use presensi_db::{Database, DbConfig};
    use std::sync::Mutex;

    struct AcceptAll;

    #[async_trait]
    impl AttendanceTransport for AcceptAll {
        async fn submit(&self, _kind: AttendanceKind, _form: &SubmitForm) -> SyncResult<SubmitResponse> {
            Ok(SubmitResponse::default())
        }
    }

    #[derive(Default)]
    struct RecordingEmitter(Mutex<Vec<SyncStatus>>);

    impl SyncEventEmitter for RecordingEmitter {
        fn emit_status(&self, status: &SyncStatus) {
            self.0.lock().unwrap().push(status.clone());
        }
    }

    fn config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.geo.max_attempts = 1;
        config.sync.min_drain_interval_ms = 20;
        config.sync.inter_entry_pause_ms = 1;
        config.sync.reconnect_delay_ms = 10;
        config.sync.poll_interval_secs = 3600;
        config
    }

    async fn setup() -> (AttendanceSyncEngine, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = config();
        let geo = GeoProvider::new(Arc::new(UnavailableSensor), config.geo.clone());
        let engine = AttendanceSyncEngine::new(&db, geo, Arc::new(AcceptAll), &config);
        (engine, db)
    }

    async fn queue_one(db: &Database) {
        let event = AttendanceEvent::new(
            AttendanceKind::CheckIn,
            AttendanceSyncEngine::today_date(),
            Position::new(-7.037943980089189, 110.47993371532893, None),
            "Present",
        );
        db.pending_queue().append(event).await.unwrap();
    }

    #[test]
    fn test_sync_status_default() {
        let status = SyncStatus::default();
        assert!(!status.running);
        assert_eq!(status.pending_count, 0);
        assert!(status.last_report.is_none());
    }

    #[tokio::test]
    async fn test_startup_tick_drains_queue() {
        let (engine, db) = setup().await;
        queue_one(&db).await;

        let emitter = Arc::new(RecordingEmitter::default());
        let handle = SyncAgent::spawn_with_emitter(engine, &config(), emitter.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = handle.status().await;
        assert!(status.running);
        assert_eq!(status.pending_count, 0);
        assert_eq!(status.last_report.map(|r| r.uploaded), Some(1));
        assert!(status.last_drain.is_some());
        assert!(!emitter.0.lock().unwrap().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_drain_now() {
        let (engine, db) = setup().await;
        let handle = SyncAgent::spawn(engine, &config());
        tokio::time::sleep(Duration::from_millis(50)).await;

        queue_one(&db).await;
        let report = handle.drain_now().await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_triggers_drain() {
        let (engine, db) = setup().await;
        let handle = SyncAgent::spawn(engine, &config());
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.connectivity(ConnectivityEvent::Offline).await.unwrap();
        queue_one(&db).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.status().await.online);
        assert_eq!(db.pending_queue().count().await.unwrap(), 1);

        handle.connectivity(ConnectivityEvent::Online).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(handle.status().await.online);
        assert_eq!(db.pending_queue().count().await.unwrap(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (engine, _db) = setup().await;
        let handle = SyncAgent::spawn(engine, &config());

        handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!handle.status().await.running);
        assert!(matches!(
            handle.drain_now().await,
            Err(SyncError::ShuttingDown)
        ));
    }
}
