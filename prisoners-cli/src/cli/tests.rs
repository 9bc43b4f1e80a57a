//! Unit tests for argument parsing, command execution, and rendering.

use super::{
    Cli, CliError, Command, ExecutionSummary, RunCommand, StrategyArgs, WorkersArgs,
    render_summary, run_cli, run_command,
};

use clap::Parser;
use prisoners_core::{ExecutionStrategy, SimulationError};
use rstest::rstest;
use tracing_subscriber::layer::SubscriberExt;

use prisoners_test_support::tracing::RecordingLayer;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn run_command_with(trials: u64, strategy: StrategyArgs) -> RunCommand {
    RunCommand {
        trials,
        prisoners: 10,
        max_cycle: Some(10),
        strategy,
    }
}

fn certain_summary(trials: u64, strategy: StrategyArgs) -> Result<ExecutionSummary, CliError> {
    run_command(run_command_with(trials, strategy), None)
}

#[rstest]
#[case(&["prisoners", "run", "--trials", "500", "sequential"], ExecutionStrategy::Sequential)]
#[case(
    &["prisoners", "run", "-n", "500", "threads", "--workers", "4"],
    ExecutionStrategy::Threads { workers: 4 },
)]
#[case(
    &["prisoners", "run", "--trials", "500", "processes", "-w", "2"],
    ExecutionStrategy::Processes { workers: 2 },
)]
fn parses_strategy_selection(#[case] args: &[&str], #[case] expected: ExecutionStrategy) {
    let cli = Cli::try_parse_from(args).expect("arguments must parse");
    let Command::Run(run) = cli.command else {
        panic!("expected the run command");
    };
    assert_eq!(run.trials, 500);
    assert_eq!(run.prisoners, 100);
    assert_eq!(run.max_cycle, None);
    assert_eq!(ExecutionStrategy::from(run.strategy), expected);
}

#[rstest]
fn parses_problem_size_overrides() {
    let cli = Cli::try_parse_from([
        "prisoners",
        "run",
        "--trials",
        "10",
        "--prisoners",
        "20",
        "--max-cycle",
        "7",
        "sequential",
    ])
    .expect("arguments must parse");
    let Command::Run(run) = cli.command else {
        panic!("expected the run command");
    };
    assert_eq!(run.prisoners, 20);
    assert_eq!(run.max_cycle, Some(7));
}

#[rstest]
fn parses_hidden_worker_command() {
    let cli = Cli::try_parse_from(["prisoners", "worker"]).expect("worker must parse");
    assert!(matches!(cli.command, Command::Worker));
}

#[rstest]
#[case::missing_strategy(&["prisoners", "run", "--trials", "10"])]
#[case::missing_trials(&["prisoners", "run", "sequential"])]
#[case::missing_workers(&["prisoners", "run", "--trials", "10", "threads"])]
#[case::unknown_strategy(&["prisoners", "run", "--trials", "10", "fibers", "-w", "2"])]
#[case::negative_trials(&["prisoners", "run", "--trials", "-5", "sequential"])]
fn rejects_invalid_arguments(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}

#[rstest]
fn run_cli_renders_sequential_summary() -> TestResult {
    let cli = Cli {
        command: Command::Run(run_command_with(4, StrategyArgs::Sequential)),
    };
    let mut output = Vec::new();
    run_cli(cli, &mut output)?;
    let text = String::from_utf8(output)?;
    assert_eq!(
        text,
        "Statistics of sequential:\n\
         Number of simulations: 4\n\
         Parameter Estimate = 1.000000\n\
         Variance is 0.000000\n\
         95% CI: {1.000000, 1.000000}\n\
         Analytic value = 1.000000\n"
    );
    Ok(())
}

#[rstest]
fn threads_report_dropped_trials() -> TestResult {
    let summary = certain_summary(10, StrategyArgs::Threads(WorkersArgs { workers: 3 }))?;
    assert_eq!(summary.report.effective_trials(), 9);
    assert_eq!(summary.report.worker_successes(), &[3, 3, 3]);

    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    let text = String::from_utf8(buffer)?;
    assert!(text.starts_with("Statistics of all threads:\n"));
    assert!(text.contains("Number of simulations: 9\n"));
    assert!(text.contains("Requested simulations: 10 (1 dropped to split evenly across 3 workers)"));
    Ok(())
}

#[rstest]
fn analytic_value_is_omitted_when_undefined() -> TestResult {
    let command = RunCommand {
        trials: 20,
        prisoners: 10,
        max_cycle: Some(2),
        strategy: StrategyArgs::Sequential,
    };
    let summary = run_command(command, None)?;
    assert_eq!(summary.analytic, None);

    let mut buffer = Vec::new();
    render_summary(&summary, &mut buffer)?;
    assert!(!String::from_utf8(buffer)?.contains("Analytic value"));
    Ok(())
}

#[rstest]
#[case::zero_workers(
    StrategyArgs::Threads(WorkersArgs { workers: 0 }),
    4,
)]
#[case::fewer_trials_than_workers(
    StrategyArgs::Threads(WorkersArgs { workers: 8 }),
    4,
)]
#[case::single_trial(StrategyArgs::Sequential, 1)]
fn invalid_runs_surface_core_errors(#[case] strategy: StrategyArgs, #[case] trials: u64) {
    let err = certain_summary(trials, strategy).expect_err("run must be rejected");
    assert!(matches!(err, CliError::Core(_)));
}

#[rstest]
fn zero_prisoners_is_rejected() {
    let command = RunCommand {
        trials: 10,
        prisoners: 0,
        max_cycle: None,
        strategy: StrategyArgs::Sequential,
    };
    let err = run_command(command, None).expect_err("zero prisoners must be rejected");
    assert!(matches!(
        err,
        CliError::Core(SimulationError::InvalidPrisoners { got: 0 })
    ));
}

#[rstest]
fn run_command_emits_tracing_fields() -> TestResult {
    let layer = RecordingLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());

    let command = run_command_with(40, StrategyArgs::Threads(WorkersArgs { workers: 4 }));
    let summary = tracing::subscriber::with_default(subscriber, || run_command(command, None))?;
    assert_eq!(summary.report.effective_trials(), 40);

    let execute = layer
        .span_named("cli.execute")
        .expect("cli.execute span must exist");
    assert_eq!(execute.fields.get("trials"), Some(&"40".to_owned()));
    assert_eq!(execute.fields.get("prisoners"), Some(&"10".to_owned()));
    assert_eq!(execute.fields.get("strategy"), Some(&"all threads".to_owned()));

    assert_eq!(layer.events_with_message("command completed").len(), 1);
    Ok(())
}
