//! # Command Line
//!
//! clap definitions for the `presensi` binary.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use presensi_core::Position;

#[derive(Debug, Parser)]
#[command(name = "presensi", version, about = "Employee attendance client")]
pub struct Cli {
    /// Config file (default: platform config dir, presensi.toml)
    #[arg(long, global = true, env = "PRESENSI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token
    Login {
        email: String,
        #[arg(long, env = "PRESENSI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Record arrival at the office
    CheckIn(PositionArgs),

    /// Record departure from the office
    CheckOut(PositionArgs),

    /// Upload queued attendance now
    Drain,

    /// List queued attendance
    Pending,

    /// Show today's check-in/check-out times
    Today,

    /// Attendance history for a month
    History(MonthArgs),

    /// Attendance calendar for a month
    Calendar(MonthArgs),

    /// Keep draining in the background until interrupted
    Watch,

    #[command(subcommand)]
    Leave(LeaveCommand),

    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Request a password reset email
    ForgotPassword { email: String },

    /// Set a new password with the emailed token
    ResetPassword {
        email: String,
        #[arg(long)]
        token: String,
        #[arg(long, env = "PRESENSI_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirmation: Option<String>,
    },

    #[command(subcommand)]
    Office(OfficeCommand),
}

/// Position reported by the caller. Without `--lat/--lng` there is no
/// location sensor and the office centre is used.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct PositionArgs {
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Accuracy radius of the fix in meters
    #[arg(long, requires = "lat")]
    pub accuracy: Option<f64>,
}

impl PositionArgs {
    pub fn position(&self) -> Option<Position> {
        Some(Position::new(self.lat?, self.lng?, self.accuracy))
    }
}

/// Month selector; defaults to the current month.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct MonthArgs {
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Debug, Subcommand)]
pub enum LeaveCommand {
    /// Past leave requests
    List,

    /// Submit a leave request
    Submit {
        #[arg(long)]
        reason: String,
        #[arg(long)]
        description: Option<String>,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Duration label, e.g. "2 days"
        #[arg(long)]
        duration: String,
        /// Supporting document
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    Show {
        /// Print the cached profile without contacting the server
        #[arg(long)]
        cached: bool,
    },

    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        photo: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum OfficeCommand {
    /// Show the geofence in effect
    Show,

    /// Persist a new geofence
    Set {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        radius: f64,
    },
}
