//! # Presensi CLI Library
//!
//! Command line shell over the attendance client.
//!
//! ## Module Organization
//! ```text
//! presensi_cli/
//! ├── lib.rs          ◄─── You are here (tracing setup & dispatch)
//! ├── cli.rs          ◄─── clap definitions
//! ├── output.rs       ◄─── Text / JSON printing
//! ├── state/
//! │   ├── mod.rs      ◄─── State exports
//! │   └── context.rs  ◄─── AppContext (db, api, engine)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── auth.rs     ◄─── login, logout, password reset
//! │   ├── attendance.rs ◄─ check-in/out, today, history, calendar
//! │   ├── sync.rs     ◄─── drain, pending, watch
//! │   ├── leave.rs    ◄─── leave list/submit
//! │   ├── profile.rs  ◄─── profile show/update
//! │   └── office.rs   ◄─── office geofence
//! └── error.rs        ◄─── CliError and exit codes
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use presensi_core::{AttendanceKind, OfficeGeofence, ProfileUpdate};
use presensi_sync::ClientConfig;

use cli::{Cli, Command, LeaveCommand, OfficeCommand, ProfileCommand};
use error::CliResult;
use output::Printer;
use state::AppContext;

/// Runs one command.
///
/// ## Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Load config (file ─► PRESENSI_* env ─► validate)                   │
/// │  2. Open database, run migrations                                      │
/// │  3. Wire SessionGuard, ApiClient, GeoProvider, AttendanceSyncEngine    │
/// │  4. Dispatch the command, print its result                             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> CliResult<()> {
    let printer = Printer::new(cli.json);
    let config = ClientConfig::load(cli.config.clone())?;

    let position = match &cli.command {
        Command::CheckIn(args) | Command::CheckOut(args) => args.position(),
        _ => None,
    };
    let ctx = AppContext::open(config, position).await?;

    let result = dispatch(&ctx, cli.command, &printer).await;
    ctx.engine.cancel_scheduled_drain();
    ctx.db.close().await;
    result
}

async fn dispatch(ctx: &AppContext, command: Command, printer: &Printer) -> CliResult<()> {
    match command {
        Command::Login { email, password } => {
            printer.print(&commands::auth::login(ctx, &email, &password).await?)
        }
        Command::Logout => printer.print(&commands::auth::logout(ctx).await?),
        Command::ForgotPassword { email } => {
            printer.print(&commands::auth::forgot_password(ctx, &email).await?)
        }
        Command::ResetPassword {
            email,
            token,
            password,
            confirmation,
        } => printer.print(
            &commands::auth::reset_password(ctx, &email, &token, &password, confirmation.as_deref())
                .await?,
        ),

        Command::CheckIn(_) => {
            printer.print(&commands::attendance::submit(ctx, AttendanceKind::CheckIn).await?)
        }
        Command::CheckOut(_) => {
            printer.print(&commands::attendance::submit(ctx, AttendanceKind::CheckOut).await?)
        }
        Command::Today => printer.print(&commands::attendance::today(ctx).await?),
        Command::History(month) => {
            printer.print(&commands::attendance::history(ctx, month).await?)
        }
        Command::Calendar(month) => {
            printer.print(&commands::attendance::calendar(ctx, month).await?)
        }

        Command::Drain => printer.print(&commands::sync::drain(ctx).await?),
        Command::Pending => printer.print(&commands::sync::pending(ctx).await?),
        Command::Watch => {
            let status = commands::sync::watch(ctx, printer).await?;
            printer.print(&status)
        }

        Command::Leave(LeaveCommand::List) => printer.print(&commands::leave::list(ctx).await?),
        Command::Leave(LeaveCommand::Submit {
            reason,
            description,
            start,
            end,
            duration,
            file,
        }) => {
            let request = commands::leave::new_request(reason, description, start, end, duration);
            printer.print(&commands::leave::submit(ctx, request, file.as_deref()).await?)
        }

        Command::Profile(ProfileCommand::Show { cached }) => {
            printer.print(&commands::profile::show(ctx, cached).await?)
        }
        Command::Profile(ProfileCommand::Update {
            name,
            email,
            phone,
            address,
            photo,
        }) => {
            let update = ProfileUpdate {
                name,
                email,
                phone,
                address,
            };
            printer.print(&commands::profile::update(ctx, update, photo.as_deref()).await?)
        }

        Command::Office(OfficeCommand::Show) => printer.print(&commands::office::show(ctx).await?),
        Command::Office(OfficeCommand::Set { lat, lng, radius }) => printer.print(
            &commands::office::set(ctx, OfficeGeofence::new(lat, lng, radius)).await?,
        ),
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=presensi=trace` - Show trace for presensi crates only
/// - Default: `info,presensi=debug,sqlx=warn`
///
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,presensi=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Presensi client starting");
}
