//! Command implementations and argument parsing for the prisoners CLI.

use std::io::{self, Write};

use clap::{Args, Parser, Subcommand};
use prisoners_core::{
    DEFAULT_PRISONERS, ExecutionStrategy, RunReport, SimulationBuilder, SimulationError,
    WorkerCommand, analytic_success_probability, serve_worker,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "prisoners",
    about = "Estimate the success probability of the 100 prisoners strategy."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Simulate the puzzle and report the estimated success probability.
    Run(RunCommand),
    /// Serve one worker's share of a process-parallel run.
    #[command(hide = true)]
    Worker,
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Number of trials to simulate.
    #[arg(long, short = 'n', value_parser = clap::value_parser!(u64))]
    pub trials: u64,

    /// Number of prisoners (and boxes).
    #[arg(long, default_value_t = DEFAULT_PRISONERS)]
    pub prisoners: usize,

    /// Boxes each prisoner may open (defaults to half the prisoners).
    #[arg(long = "max-cycle")]
    pub max_cycle: Option<usize>,

    /// Where the trials run.
    #[command(subcommand)]
    pub strategy: StrategyArgs,
}

/// Execution strategies selectable from the command line.
#[derive(Debug, Subcommand, Clone, Copy)]
pub enum StrategyArgs {
    /// Run every trial on a single thread.
    Sequential,
    /// Split trials evenly across worker threads.
    Threads(WorkersArgs),
    /// Split trials evenly across worker processes.
    Processes(WorkersArgs),
}

/// Worker count for the parallel strategies.
#[derive(Debug, Args, Clone, Copy)]
pub struct WorkersArgs {
    /// Number of workers; trials beyond a multiple of this are dropped.
    #[arg(long, short = 'w')]
    pub workers: usize,
}

impl From<StrategyArgs> for ExecutionStrategy {
    fn from(args: StrategyArgs) -> Self {
        match args {
            StrategyArgs::Sequential => Self::Sequential,
            StrategyArgs::Threads(WorkersArgs { workers }) => Self::Threads { workers },
            StrategyArgs::Processes(WorkersArgs { workers }) => Self::Processes { workers },
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Writing command output failed.
    #[error("failed to write output: {source}")]
    Output {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Core simulation failed.
    #[error(transparent)]
    Core(#[from] SimulationError),
}

/// Summarises the outcome of a `run` command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Aggregate report produced by the simulation.
    pub report: RunReport,
    /// Exact success probability, when known in closed form.
    pub analytic: Option<f64>,
}

/// Executes the CLI command represented by `cli`, writing its output to
/// `writer`.
///
/// Process workers are launched by re-running the current executable with
/// the `worker` command.
///
/// # Errors
/// Returns [`CliError`] when the simulation fails or output cannot be
/// written.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// use prisoners_cli::cli::{Cli, Command, RunCommand, StrategyArgs, run_cli};
///
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let cli = Cli {
///     command: Command::Run(RunCommand {
///         trials: 100,
///         prisoners: 100,
///         max_cycle: None,
///         strategy: StrategyArgs::Sequential,
///     }),
/// };
/// let mut output = Vec::new();
/// run_cli(cli, &mut output)?;
/// assert!(String::from_utf8(output)?.contains("Number of simulations: 100"));
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli, writer),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli, mut writer: impl Write) -> Result<(), CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", "run");
            let summary = run_command(run, None)?;
            render_summary(&summary, &mut writer).map_err(|source| CliError::Output { source })?;
            writer.flush().map_err(|source| CliError::Output { source })
        }
        Command::Worker => {
            Span::current().record("command", "worker");
            serve_worker(writer)?;
            Ok(())
        }
    }
}

/// Runs a simulation for `command`.
///
/// `worker` overrides the command used to launch worker processes; when
/// `None` the current executable is re-run with the `worker` command.
///
/// # Errors
/// Returns [`CliError::Core`] when the configuration is invalid or the
/// simulation fails.
#[instrument(
    name = "cli.execute",
    err,
    skip(command, worker),
    fields(
        trials = command.trials,
        prisoners = command.prisoners,
        strategy = field::Empty,
    ),
)]
pub fn run_command(
    command: RunCommand,
    worker: Option<WorkerCommand>,
) -> Result<ExecutionSummary, CliError> {
    let strategy = ExecutionStrategy::from(command.strategy);
    Span::current().record("strategy", strategy.label());

    let mut builder = SimulationBuilder::new()
        .with_prisoners(command.prisoners)
        .with_trials(command.trials)
        .with_execution_strategy(strategy);
    if let Some(max_cycle) = command.max_cycle {
        builder = builder.with_max_cycle_length(max_cycle);
    }
    if let Some(worker_command) = worker {
        builder = builder.with_worker_command(worker_command);
    }

    let report = builder.build()?.run()?;
    let analytic = analytic_success_probability(&report.config());
    info!(
        label = report.label(),
        effective_trials = report.effective_trials(),
        mean = report.statistics().mean(),
        "command completed"
    );
    Ok(ExecutionSummary { report, analytic })
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let report = &summary.report;
    let statistics = report.statistics();
    let interval = statistics.confidence_interval();

    writeln!(writer, "Statistics of {}:", report.label())?;
    writeln!(writer, "Number of simulations: {}", report.effective_trials())?;
    let dropped = report.requested_trials() - report.effective_trials();
    if dropped > 0 {
        writeln!(
            writer,
            "Requested simulations: {} ({dropped} dropped to split evenly across {} workers)",
            report.requested_trials(),
            report.strategy().workers()
        )?;
    }
    writeln!(writer, "Parameter Estimate = {:.6}", statistics.mean())?;
    writeln!(writer, "Variance is {:.6}", statistics.variance())?;
    writeln!(writer, "95% CI: {{{:.6}, {:.6}}}", interval.low, interval.high)?;
    if let Some(analytic) = summary.analytic {
        writeln!(writer, "Analytic value = {analytic:.6}")?;
    }
    Ok(())
}
