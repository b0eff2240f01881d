//! # Presensi CLI Entry Point
//!
//! ## Startup Sequence
//! 1. Parse the command line
//! 2. Initialize tracing (logging)
//! 3. Run the command (see `presensi_cli::run`)
//! 4. Map failures to an exit status

use clap::Parser;
use std::process::ExitCode;

use presensi_cli::cli::Cli;
use presensi_cli::output::Printer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    presensi_cli::init_tracing();

    let printer = Printer::new(cli.json);
    match presensi_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            printer.error(&e);
            ExitCode::from(e.code().exit_status())
        }
    }
}
