//! # Commands
//!
//! One module per command group. Each command takes the [`AppContext`]
//! and returns a serializable result; printing happens in `lib.rs`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  auth.rs        login, logout, forgot-password, reset-password         │
//! │  attendance.rs  check-in, check-out, today, history, calendar          │
//! │  sync.rs        drain, pending, watch                                  │
//! │  leave.rs       leave list, leave submit                               │
//! │  profile.rs     profile show, profile update                           │
//! │  office.rs      office show, office set                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`AppContext`]: crate::state::AppContext

pub mod attendance;
pub mod auth;
pub mod leave;
pub mod office;
pub mod profile;
pub mod sync;

use serde::Serialize;

use crate::output::Render;

/// A server acknowledgement with an optional message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub ok: bool,
    pub message: Option<String>,
}

impl MessageView {
    pub fn ok(message: Option<String>) -> Self {
        MessageView { ok: true, message }
    }
}

impl Render for MessageView {
    fn render(&self) -> String {
        self.message.clone().unwrap_or_else(|| "Done".to_string())
    }
}
