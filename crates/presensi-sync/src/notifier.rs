//! # Change Notifier
//!
//! Broadcasts "attendance state changed" to whoever is listening (home
//! screen, history screen, CLI). The engine never knows who subscribed.

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use presensi_core::{AttendanceKind, RemovalReason};

/// Why an action went to the pending queue instead of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    /// The fix was too coarse to submit.
    LowAccuracy,
    /// The resolved position was outside the office radius.
    OutsideGeofence,
    /// The backend could not be reached or was temporarily unwilling.
    Deferred,
}

impl std::fmt::Display for QueueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QueueReason::LowAccuracy => "low accuracy",
            QueueReason::OutsideGeofence => "outside geofence",
            QueueReason::Deferred => "deferred",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AttendanceChange {
    /// The backend accepted the action (direct submit or drain upload).
    Confirmed {
        kind: AttendanceKind,
        date: NaiveDate,
    },
    Queued {
        id: String,
        kind: AttendanceKind,
        date: NaiveDate,
        reason: QueueReason,
    },
    /// Left the queue without being uploaded (conflict, rejected, malformed).
    Resolved {
        id: String,
        kind: AttendanceKind,
        date: NaiveDate,
        reason: RemovalReason,
    },
    /// A stored row that no longer decodes was deleted.
    Discarded { id: String },
    /// Gave up after too many failed uploads.
    Abandoned {
        id: String,
        kind: AttendanceKind,
        date: NaiveDate,
    },
}

#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<AttendanceChange>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        ChangeNotifier { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceChange> {
        self.sender.subscribe()
    }

    /// Fire and forget; no subscribers is fine.
    pub fn notify(&self, change: AttendanceChange) {
        trace!(?change, "Attendance change");
        let _ = self.sender.send(change);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = ChangeNotifier::default();
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.notify(AttendanceChange::Confirmed {
            kind: AttendanceKind::CheckIn,
            date: day(),
        });
    }

    #[tokio::test]
    async fn test_subscribers_receive_changes() {
        let notifier = ChangeNotifier::default();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        let change = AttendanceChange::Abandoned {
            id: "1-abcdef".into(),
            kind: AttendanceKind::CheckOut,
            date: day(),
        };
        notifier.notify(change.clone());

        assert_eq!(a.recv().await.unwrap(), change);
        assert_eq!(b.recv().await.unwrap(), change);
    }

    #[test]
    fn test_change_serialization() {
        let json = serde_json::to_value(AttendanceChange::Queued {
            id: "1-abcdef".into(),
            kind: AttendanceKind::CheckIn,
            date: day(),
            reason: QueueReason::LowAccuracy,
        })
        .unwrap();
        assert_eq!(json["event"], "queued");
        assert_eq!(json["kind"], "check-in");
        assert_eq!(json["reason"], "low_accuracy");
        assert_eq!(json["date"], "2024-03-01");
    }
}
