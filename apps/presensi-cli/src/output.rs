//! # Output
//!
//! Every command result is printed either as pretty JSON (`--json`) or as a
//! short human summary via [`Render`].

use serde::Serialize;
use std::fmt::Write;

use presensi_core::{AttendanceEvent, CalendarDay, DailyAttendanceRecord, EmployeeProfile, LeaveRequest};
use presensi_sync::{AttendanceChange, DrainReport, SubmitOutcome, SyncStatus};

use crate::error::{CliError, CliResult};

/// Human-readable form of a command result.
pub trait Render {
    fn render(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Printer { json }
    }

    pub fn print<T: Serialize + Render>(&self, value: &T) -> CliResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", value.render());
        }
        Ok(())
    }

    pub fn error(&self, error: &CliError) {
        let report = error.report();
        match serde_json::to_string(&report) {
            Ok(json) if self.json => eprintln!("{json}"),
            _ => eprintln!("error: {}", report.message),
        }
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

// =============================================================================
// Attendance
// =============================================================================

impl Render for SubmitOutcome {
    fn render(&self) -> String {
        match self {
            SubmitOutcome::Confirmed {
                kind, time, message, ..
            } => {
                let mut out = format!("{kind} recorded at {time}");
                if let Some(message) = message.as_deref().filter(|m| !m.is_empty()) {
                    let _ = write!(out, " ({message})");
                }
                out
            }
            SubmitOutcome::Queued { id: Some(id), reason } => {
                format!("Saved offline ({reason}), will sync automatically [{id}]")
            }
            SubmitOutcome::Queued { id: None, reason } => {
                format!("Could not submit ({reason}) and could not save offline")
            }
        }
    }
}

impl Render for Vec<AttendanceEvent> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No pending attendance".to_string();
        }
        let mut out = format!("{} pending:", self.len());
        for event in self {
            let _ = write!(
                out,
                "\n  {}  {:<9}  {}  ({:.6}, {:.6})  retries={}",
                event.id, event.kind, event.date, event.latitude, event.longitude, event.retries
            );
            if let Some(distance) = event.distance {
                let _ = write!(out, "  {distance:.0} m");
            }
        }
        out
    }
}

impl Render for Vec<DailyAttendanceRecord> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No attendance records".to_string();
        }
        self.iter()
            .map(|r| {
                format!(
                    "{:<10}  in {:<8}  out {:<8}  {}",
                    or_dash(r.day_key()),
                    or_dash(r.check_in.as_deref()),
                    or_dash(r.check_out.as_deref()),
                    or_dash(r.status.as_deref()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Render for Vec<CalendarDay> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No calendar entries".to_string();
        }
        self.iter()
            .map(|d| format!("{:<10}  {}", d.date, or_dash(d.status.as_deref())))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Sync
// =============================================================================

impl Render for DrainReport {
    fn render(&self) -> String {
        if let Some(reason) = self.skipped {
            return format!("Drain skipped: {reason:?}");
        }
        format!(
            "uploaded {}, already recorded {}, dropped {}, abandoned {}, retried {}",
            self.uploaded, self.resolved, self.dropped, self.abandoned, self.retried
        )
    }
}

impl Render for AttendanceChange {
    fn render(&self) -> String {
        match self {
            AttendanceChange::Confirmed { kind, date } => format!("{date} {kind}: confirmed"),
            AttendanceChange::Queued {
                id, kind, date, reason,
            } => format!("{date} {kind}: queued ({reason}) [{id}]"),
            AttendanceChange::Resolved {
                id, kind, date, reason,
            } => format!("{date} {kind}: removed from queue ({reason:?}) [{id}]"),
            AttendanceChange::Discarded { id } => format!("unreadable queue entry removed [{id}]"),
            AttendanceChange::Abandoned { id, kind, date } => {
                format!("{date} {kind}: gave up after repeated failures [{id}]")
            }
        }
    }
}

impl Render for SyncStatus {
    fn render(&self) -> String {
        let mut out = format!(
            "{}, {} pending",
            if self.online { "online" } else { "offline" },
            self.pending_count
        );
        if let Some(at) = self.last_drain {
            let _ = write!(out, ", last drain {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        out
    }
}

// =============================================================================
// Leave & Profile
// =============================================================================

impl Render for Vec<LeaveRequest> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No leave requests".to_string();
        }
        self.iter()
            .map(|l| {
                format!(
                    "{} .. {}  {:<10}  {}  [{}]",
                    or_dash(l.start_date.as_deref()),
                    or_dash(l.end_date.as_deref()),
                    or_dash(l.duration.as_deref()),
                    l.reason,
                    or_dash(l.status.as_deref()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Render for EmployeeProfile {
    fn render(&self) -> String {
        format!(
            "{} <{}>\n  phone:    {}\n  position: {}\n  address:  {}",
            self.name,
            self.email,
            or_dash(self.phone.as_deref()),
            or_dash(self.position.as_deref()),
            or_dash(self.address.as_deref()),
        )
    }
}

impl Render for Option<EmployeeProfile> {
    fn render(&self) -> String {
        match self {
            Some(profile) => profile.render(),
            None => "No cached profile".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use presensi_core::AttendanceKind;
    use presensi_sync::QueueReason;

    #[test]
    fn test_render_outcomes() {
        let confirmed = SubmitOutcome::Confirmed {
            kind: AttendanceKind::CheckIn,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            time: "08:01".into(),
            message: Some("Welcome".into()),
        };
        assert_eq!(confirmed.render(), "check-in recorded at 08:01 (Welcome)");

        let queued = SubmitOutcome::Queued {
            id: Some("1-abcdef".into()),
            reason: QueueReason::Deferred,
        };
        assert!(queued.render().contains("deferred"));
        assert!(queued.render().contains("1-abcdef"));
    }

    #[test]
    fn test_render_empty_lists() {
        assert_eq!(Vec::<AttendanceEvent>::new().render(), "No pending attendance");
        assert_eq!(Vec::<LeaveRequest>::new().render(), "No leave requests");
        assert_eq!(None::<EmployeeProfile>.render(), "No cached profile");
    }

    #[test]
    fn test_render_history_fills_gaps() {
        let records = vec![DailyAttendanceRecord {
            date: Some("2024-03-01".into()),
            check_in: Some("08:00:00".into()),
            ..Default::default()
        }];
        let text = records.render();
        assert!(text.starts_with("2024-03-01"));
        assert!(text.contains("out -"));
    }
}
