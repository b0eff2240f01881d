//! # Drain Scheduler
//!
//! Owns the single deferred-drain timer and the last-drain instant.
//!
//! ## Scheduling Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  schedule(delay)                                                       │
//! │       │                                                                 │
//! │       ├── outside rate-limit window ──► abort pending timer (if any),  │
//! │       │                                 fire after `delay`             │
//! │       │                                                                 │
//! │       └── inside window                                                │
//! │              ├── timer pending ───────► coalesce (no new timer)        │
//! │              └── none pending ────────► fire at window end + 50 ms     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Slack added after the rate-limit window so the deferred drain is not
/// itself rate limited.
const WINDOW_SLACK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A new timer was armed.
    Scheduled { fires_in: Duration },
    /// A pending timer was aborted and replaced.
    Replaced { fires_in: Duration },
    /// Folded into the timer that is already pending.
    Coalesced,
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct State {
    pending: Option<Pending>,
    generation: u64,
    last_drain: Option<Instant>,
}

impl State {
    fn has_live_timer(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.handle.is_finished())
    }
}

#[derive(Debug, Clone)]
pub struct DrainScheduler {
    state: Arc<Mutex<State>>,
    min_interval: Duration,
}

impl DrainScheduler {
    pub fn new(min_interval: Duration) -> Self {
        DrainScheduler {
            state: Arc::new(Mutex::new(State::default())),
            min_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Records that a drain started now.
    pub fn mark_drained(&self) {
        self.lock().last_drain = Some(Instant::now());
    }

    pub fn last_drain(&self) -> Option<Instant> {
        self.lock().last_drain
    }

    /// Time left in the rate-limit window, if inside it.
    pub fn window_remaining(&self) -> Option<Duration> {
        let last = self.lock().last_drain?;
        let elapsed = last.elapsed();
        (elapsed < self.min_interval).then(|| self.min_interval - elapsed)
    }

    /// Arms a timer that runs `job` after `delay` (see module docs).
    pub fn schedule<F>(&self, delay: Duration, job: F) -> ScheduleOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window_remaining();
        let mut state = self.lock();

        let (fires_in, replaced) = match window {
            Some(_) if state.has_live_timer() => {
                debug!("Drain already pending, coalescing");
                return ScheduleOutcome::Coalesced;
            }
            Some(remaining) => (remaining + WINDOW_SLACK, false),
            None => {
                let replaced = match state.pending.take() {
                    Some(old) if !old.handle.is_finished() => {
                        old.handle.abort();
                        true
                    }
                    _ => false,
                };
                (delay, replaced)
            }
        };

        state.generation += 1;
        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(fires_in).await;
            {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if state.pending.as_ref().is_some_and(|p| p.generation == generation) {
                    state.pending = None;
                }
            }
            job.await;
        });
        state.pending = Some(Pending { generation, handle });

        debug!(fires_in_ms = fires_in.as_millis() as u64, replaced, "Drain scheduled");
        if replaced {
            ScheduleOutcome::Replaced { fires_in }
        } else {
            ScheduleOutcome::Scheduled { fires_in }
        }
    }

    /// Aborts the pending timer. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        match self.lock().pending.take() {
            Some(p) if !p.handle.is_finished() => {
                p.handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.lock().has_live_timer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter_job(counter: &Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_once() {
        let scheduler = DrainScheduler::new(Duration::from_secs(3));
        let runs = Arc::new(AtomicU32::new(0));

        let outcome = scheduler.schedule(Duration::from_millis(300), counter_job(&runs));
        assert_eq!(
            outcome,
            ScheduleOutcome::Scheduled {
                fires_in: Duration::from_millis(300)
            }
        );
        assert!(scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_outside_window() {
        let scheduler = DrainScheduler::new(Duration::from_secs(3));
        let runs = Arc::new(AtomicU32::new(0));

        scheduler.schedule(Duration::from_millis(300), counter_job(&runs));
        let outcome = scheduler.schedule(Duration::from_millis(500), counter_job(&runs));
        assert!(matches!(outcome, ScheduleOutcome::Replaced { .. }));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesce_inside_window() {
        let scheduler = DrainScheduler::new(Duration::from_secs(3));
        let runs = Arc::new(AtomicU32::new(0));
        scheduler.mark_drained();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let first = scheduler.schedule(Duration::from_millis(10), counter_job(&runs));
        assert_eq!(
            first,
            ScheduleOutcome::Scheduled {
                fires_in: Duration::from_millis(2050)
            }
        );
        for _ in 0..5 {
            assert_eq!(
                scheduler.schedule(Duration::from_millis(10), counter_job(&runs)),
                ScheduleOutcome::Coalesced
            );
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let scheduler = DrainScheduler::new(Duration::from_secs(3));
        let runs = Arc::new(AtomicU32::new(0));

        scheduler.schedule(Duration::from_millis(300), counter_job(&runs));
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_remaining() {
        let scheduler = DrainScheduler::new(Duration::from_secs(3));
        assert!(scheduler.window_remaining().is_none());

        scheduler.mark_drained();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(scheduler.window_remaining(), Some(Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(scheduler.window_remaining().is_none());
    }
}
