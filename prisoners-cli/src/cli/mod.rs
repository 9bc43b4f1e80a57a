//! Command-line interface for the prisoners estimator.
//!
//! The `run` command simulates the 100 prisoners problem sequentially, on
//! worker threads, or in worker processes, and prints the aggregate
//! statistics. The hidden `worker` command is the entry point for worker
//! processes launched by `run ... processes`.

mod commands;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, RunCommand, StrategyArgs, WorkersArgs,
    render_summary, run_cli, run_command,
};

#[cfg(test)]
mod tests;
