//! CLI entry point for the prisoners estimator.
//!
//! Parses arguments with clap, runs the requested command, and maps errors to
//! a failing exit code. Logging is initialised first so worker processes
//! announce themselves on `stderr` like the coordinator does.

use std::io::{self, BufWriter};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use prisoners_cli::{
    cli::{Cli, CliError, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

/// Parse CLI arguments and execute the command against a buffered stdout.
fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let writer = BufWriter::new(stdout.lock());
    run_cli(cli, writer).context("failed to execute command")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let (code, statistics_code) = err
            .downcast_ref::<CliError>()
            .and_then(|cli_error| match cli_error {
                CliError::Core(core) => Some((Some(core.code()), core.statistics_code())),
                CliError::Output { .. } => None,
            })
            .unwrap_or((None, None));

        let code_field = code.map(|code| field::display(code.as_str()));
        let statistics_code_field = statistics_code.map(|code| field::display(code.as_str()));

        error!(
            error = %err,
            code = code_field,
            statistics_code = statistics_code_field,
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
