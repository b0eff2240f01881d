//! # Sync Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  drain    - one drain pass over the pending queue                      │
//! │  pending  - list the pending queue                                     │
//! │  watch    - run the SyncAgent, print changes until Ctrl-C              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use presensi_core::AttendanceEvent;
use presensi_sync::{DrainReport, SyncAgent, SyncStatus};

use crate::error::CliResult;
use crate::output::Printer;
use crate::state::AppContext;

pub async fn drain(ctx: &AppContext) -> CliResult<DrainReport> {
    Ok(ctx.engine.drain_queue().await)
}

pub async fn pending(ctx: &AppContext) -> CliResult<Vec<AttendanceEvent>> {
    Ok(ctx.engine.pending().await?)
}

/// Runs the background agent and prints attendance changes until Ctrl-C.
/// Returns the agent status at shutdown.
pub async fn watch(ctx: &AppContext, printer: &Printer) -> CliResult<SyncStatus> {
    let mut changes = ctx.engine.subscribe();
    let agent = SyncAgent::spawn(ctx.engine.clone(), &ctx.config);
    info!(
        poll_interval_secs = ctx.config.sync.poll_interval_secs,
        "Watching pending queue, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) => printer.print(&change)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed attendance changes"),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    let status = agent.status().await;
    agent.shutdown().await;
    Ok(status)
}
