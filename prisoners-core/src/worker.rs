//! Worker process protocol.
//!
//! The coordinator launches each worker process with its assignment in
//! environment variables and a private stdout pipe. The worker seeds its own
//! [`RandomSource`], runs its share of trials, and writes a single
//! `successes=<count>` line to that pipe before exiting.

use std::{
    env,
    ffi::OsString,
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
    sync::Arc,
};

use tracing::{info, instrument};

use crate::{
    Result,
    error::SimulationError,
    harness::run_worker_trials,
    trial::TrialConfig,
};

/// Environment variable carrying the zero-based worker index.
pub const WORKER_INDEX_ENV: &str = "PRISONERS_WORKER_INDEX";
/// Environment variable carrying the number of trials to run.
pub const WORKER_TRIALS_ENV: &str = "PRISONERS_WORKER_TRIALS";
/// Environment variable carrying the number of prisoners.
pub const WORKER_PRISONERS_ENV: &str = "PRISONERS_WORKER_PRISONERS";
/// Environment variable carrying the box budget.
pub const WORKER_MAX_CYCLE_ENV: &str = "PRISONERS_WORKER_MAX_CYCLE";

const REPORT_PREFIX: &str = "successes=";

/// Program and arguments used to launch worker processes.
///
/// # Examples
/// ```
/// use prisoners_core::WorkerCommand;
///
/// let command = WorkerCommand::new("/usr/local/bin/prisoners").arg("worker");
/// assert_eq!(command.program().to_str(), Some("/usr/local/bin/prisoners"));
/// assert_eq!(command.args().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    /// Launch workers by running `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-launch the current executable with a `worker` argument.
    ///
    /// # Errors
    /// Returns [`SimulationError::WorkerSpawn`] when the path of the current
    /// executable cannot be determined.
    pub fn current_exe() -> Result<Self> {
        let program = env::current_exe().map_err(|err| SimulationError::WorkerSpawn {
            worker: 0,
            message: Arc::from(format!("cannot locate current executable: {err}")),
        })?;
        Ok(Self::new(program).arg("worker"))
    }

    /// Appends an argument passed to every worker.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program launched for each worker.
    #[must_use]
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Arguments passed to each worker.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub(crate) fn command_for(&self, assignment: &WorkerAssignment) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(WORKER_INDEX_ENV, assignment.index.to_string())
            .env(WORKER_TRIALS_ENV, assignment.trials.to_string())
            .env(WORKER_PRISONERS_ENV, assignment.config.prisoners().to_string())
            .env(
                WORKER_MAX_CYCLE_ENV,
                assignment.config.max_cycle_length().to_string(),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }
}

/// Share of a run handed to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAssignment {
    /// Zero-based worker index.
    pub index: usize,
    /// Number of trials the worker runs.
    pub trials: u64,
    /// Trial parameters.
    pub config: TrialConfig,
}

impl WorkerAssignment {
    /// Reads an assignment from the process environment.
    ///
    /// # Errors
    /// Returns [`SimulationError::WorkerEnvironment`] when a variable is
    /// missing or malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads an assignment through `lookup`, which maps variable names to
    /// values.
    ///
    /// # Errors
    /// Returns [`SimulationError::WorkerEnvironment`] when a variable is
    /// missing or malformed, and [`SimulationError::InvalidPrisoners`] when
    /// the prisoner count is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let index = read_var(&lookup, WORKER_INDEX_ENV)?;
        let trials = read_var(&lookup, WORKER_TRIALS_ENV)?;
        let prisoners = read_var(&lookup, WORKER_PRISONERS_ENV)?;
        let max_cycle_length = read_var(&lookup, WORKER_MAX_CYCLE_ENV)?;
        Ok(Self {
            index,
            trials,
            config: TrialConfig::new(prisoners, max_cycle_length)?,
        })
    }
}

fn read_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    variable: &'static str,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = lookup(variable).ok_or_else(|| SimulationError::WorkerEnvironment {
        variable,
        message: Arc::from("not set"),
    })?;
    raw.trim()
        .parse()
        .map_err(|err: T::Err| SimulationError::WorkerEnvironment {
            variable,
            message: Arc::from(format!("`{raw}`: {err}")),
        })
}

/// Formats the single report line a worker writes to stdout.
///
/// # Examples
/// ```
/// use prisoners_core::{format_worker_report, parse_worker_report};
///
/// let line = format_worker_report(42);
/// assert_eq!(line, "successes=42");
/// assert_eq!(parse_worker_report(0, line.as_bytes()), Ok(42));
/// ```
#[must_use]
pub fn format_worker_report(successes: u64) -> String {
    format!("{REPORT_PREFIX}{successes}")
}

/// Parses the stdout captured from worker `worker`.
///
/// # Errors
/// Returns [`SimulationError::MalformedWorkerReport`] unless the output is a
/// single `successes=<count>` line.
pub fn parse_worker_report(worker: usize, output: &[u8]) -> Result<u64> {
    let malformed = |message: String| SimulationError::MalformedWorkerReport {
        worker,
        message: Arc::from(message),
    };
    let text = std::str::from_utf8(output)
        .map_err(|err| malformed(format!("output is not UTF-8: {err}")))?;
    let line = text.trim();
    let count = line
        .strip_prefix(REPORT_PREFIX)
        .ok_or_else(|| malformed(format!("expected `{REPORT_PREFIX}<count>`, got `{line}`")))?;
    count
        .parse()
        .map_err(|err| malformed(format!("invalid success count `{count}`: {err}")))
}

/// Runs the worker side of the process protocol.
///
/// Reads the assignment from the environment, runs the trials with a freshly
/// seeded random stream, and writes the report line to `out`.
///
/// # Errors
/// Returns [`SimulationError::WorkerEnvironment`] for a bad assignment,
/// [`SimulationError::Entropy`] when seeding fails, and
/// [`SimulationError::WorkerOutput`] when the report cannot be written.
#[instrument(name = "worker.serve", err, skip(out))]
pub fn serve_worker(mut out: impl Write) -> Result<u64> {
    let assignment = WorkerAssignment::from_env()?;
    let successes = run_worker_trials(
        "process",
        assignment.index,
        assignment.trials,
        &assignment.config,
    )?;
    writeln!(out, "{}", format_worker_report(successes))
        .and_then(|()| out.flush())
        .map_err(|err| SimulationError::WorkerOutput {
            message: Arc::from(err.to_string()),
        })?;
    info!(worker = assignment.index, successes, "worker report written");
    Ok(successes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use rstest::rstest;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn complete_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (WORKER_INDEX_ENV, "2"),
            (WORKER_TRIALS_ENV, "250"),
            (WORKER_PRISONERS_ENV, "100"),
            (WORKER_MAX_CYCLE_ENV, "50"),
        ]
    }

    #[rstest]
    fn assignment_reads_every_variable() {
        let assignment =
            WorkerAssignment::from_lookup(lookup_from(&complete_env())).expect("env is complete");
        assert_eq!(assignment.index, 2);
        assert_eq!(assignment.trials, 250);
        assert_eq!(assignment.config, TrialConfig::default());
    }

    #[rstest]
    #[case::index(WORKER_INDEX_ENV)]
    #[case::trials(WORKER_TRIALS_ENV)]
    #[case::prisoners(WORKER_PRISONERS_ENV)]
    #[case::max_cycle(WORKER_MAX_CYCLE_ENV)]
    fn assignment_reports_missing_variable(#[case] missing: &'static str) {
        let env: Vec<_> = complete_env()
            .into_iter()
            .filter(|(name, _)| *name != missing)
            .collect();
        let err = WorkerAssignment::from_lookup(lookup_from(&env))
            .expect_err("missing variable must be rejected");
        assert!(matches!(
            err,
            SimulationError::WorkerEnvironment { variable, .. } if variable == missing
        ));
    }

    #[rstest]
    fn assignment_rejects_non_numeric_values() {
        let mut env = complete_env();
        env[1] = (WORKER_TRIALS_ENV, "many");
        let err = WorkerAssignment::from_lookup(lookup_from(&env))
            .expect_err("non-numeric trials must be rejected");
        assert!(matches!(
            err,
            SimulationError::WorkerEnvironment {
                variable: WORKER_TRIALS_ENV,
                ..
            }
        ));
    }

    #[rstest]
    fn assignment_rejects_zero_prisoners() {
        let mut env = complete_env();
        env[2] = (WORKER_PRISONERS_ENV, "0");
        let err = WorkerAssignment::from_lookup(lookup_from(&env))
            .expect_err("zero prisoners must be rejected");
        assert_eq!(err, SimulationError::InvalidPrisoners { got: 0 });
    }

    #[rstest]
    #[case::trailing_newline(b"successes=17\n".as_slice(), 17)]
    #[case::zero(b"successes=0".as_slice(), 0)]
    fn parses_well_formed_reports(#[case] output: &[u8], #[case] expected: u64) {
        assert_eq!(parse_worker_report(0, output), Ok(expected));
    }

    #[rstest]
    #[case::empty(b"".as_slice())]
    #[case::wrong_prefix(b"count=3".as_slice())]
    #[case::negative(b"successes=-3".as_slice())]
    #[case::not_utf8(b"\xff\xfe".as_slice())]
    fn rejects_malformed_reports(#[case] output: &[u8]) {
        let err = parse_worker_report(3, output).expect_err("report must be rejected");
        assert!(matches!(
            err,
            SimulationError::MalformedWorkerReport { worker: 3, .. }
        ));
    }

    #[rstest]
    fn command_carries_assignment_in_environment() {
        let assignment = WorkerAssignment {
            index: 1,
            trials: 9,
            config: TrialConfig::new(10, 5).expect("valid configuration"),
        };
        let command = WorkerCommand::new("worker-bin")
            .arg("worker")
            .command_for(&assignment);
        let envs: HashMap<_, _> = command
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_str()?.to_owned(), v?.to_str()?.to_owned())))
            .collect();
        assert_eq!(envs.get(WORKER_INDEX_ENV).map(String::as_str), Some("1"));
        assert_eq!(envs.get(WORKER_TRIALS_ENV).map(String::as_str), Some("9"));
        assert_eq!(envs.get(WORKER_PRISONERS_ENV).map(String::as_str), Some("10"));
        assert_eq!(envs.get(WORKER_MAX_CYCLE_ENV).map(String::as_str), Some("5"));
        assert_eq!(command.get_args().count(), 1);
    }
}
