//! Execution harness for simulation runs.
//!
//! The harness partitions the requested trials across workers, lets every
//! worker run its share with a privately seeded [`RandomSource`], waits for
//! all of them, and only then aggregates the summed success count.

mod processes;
mod threads;

use tracing::{Span, debug, field, info, instrument, warn};

use crate::{
    Result,
    builder::ExecutionStrategy,
    error::SimulationError,
    rng::RandomSource,
    statistics::{StatisticsReport, aggregate},
    trial::{TrialConfig, count_successes},
    worker::WorkerCommand,
};

/// How a requested trial count is split across workers.
///
/// Each worker receives `requested / workers` trials. The remainder is not
/// reassigned, so up to `workers - 1` trials are dropped.
///
/// # Examples
/// ```
/// use prisoners_core::Partition;
///
/// let partition = Partition::new(10, 3);
/// assert_eq!(partition.per_worker(), 3);
/// assert_eq!(partition.effective_trials(), 9);
/// assert_eq!(partition.dropped_trials(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    requested: u64,
    workers: usize,
    per_worker: u64,
}

impl Partition {
    /// Splits `requested` trials across `workers` workers.
    ///
    /// A worker count of zero yields an empty partition.
    #[must_use]
    pub fn new(requested: u64, workers: usize) -> Self {
        let per_worker = requested.checked_div(workers as u64).unwrap_or(0);
        Self {
            requested,
            workers,
            per_worker,
        }
    }

    /// Trials assigned to each worker.
    #[must_use]
    pub fn per_worker(&self) -> u64 {
        self.per_worker
    }

    /// Number of workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Trials that will actually run.
    #[must_use]
    pub fn effective_trials(&self) -> u64 {
        self.per_worker * self.workers as u64
    }

    /// Trials dropped by integer division.
    #[must_use]
    pub fn dropped_trials(&self) -> u64 {
        self.requested - self.effective_trials()
    }
}

/// Outcome of a completed simulation run.
///
/// The embedded [`StatisticsReport`] counts only the trials that actually
/// ran; [`RunReport::requested_trials`] keeps the original request for
/// comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    strategy: ExecutionStrategy,
    config: TrialConfig,
    requested_trials: u64,
    worker_successes: Vec<u64>,
    statistics: StatisticsReport,
}

impl RunReport {
    /// Label describing where the trials ran.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.strategy.label()
    }

    /// Strategy the run used.
    #[must_use]
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Trial parameters the run used.
    #[must_use]
    pub fn config(&self) -> TrialConfig {
        self.config
    }

    /// Trials requested by the caller.
    #[must_use]
    pub fn requested_trials(&self) -> u64 {
        self.requested_trials
    }

    /// Trials actually counted.
    #[must_use]
    pub fn effective_trials(&self) -> u64 {
        self.statistics.trials()
    }

    /// Success count reported by each worker, indexed by worker.
    #[must_use]
    pub fn worker_successes(&self) -> &[u64] {
        &self.worker_successes
    }

    /// Aggregate statistics over every counted trial.
    #[must_use]
    pub fn statistics(&self) -> &StatisticsReport {
        &self.statistics
    }
}

/// A validated simulation, ready to run.
///
/// Constructed through [`crate::SimulationBuilder`].
///
/// # Examples
/// ```
/// use prisoners_core::SimulationBuilder;
///
/// let report = SimulationBuilder::new()
///     .with_trials(200)
///     .build()
///     .expect("configuration is valid")
///     .run()
///     .expect("run must succeed");
/// assert_eq!(report.effective_trials(), 200);
/// assert_eq!(report.label(), "sequential");
/// ```
#[derive(Debug, Clone)]
pub struct Simulation {
    config: TrialConfig,
    trials: u64,
    strategy: ExecutionStrategy,
    worker_command: Option<WorkerCommand>,
}

impl Simulation {
    pub(crate) fn new(
        config: TrialConfig,
        trials: u64,
        strategy: ExecutionStrategy,
        worker_command: Option<WorkerCommand>,
    ) -> Self {
        Self {
            config,
            trials,
            strategy,
            worker_command,
        }
    }

    /// Trial parameters for every trial in the run.
    #[must_use]
    pub fn config(&self) -> TrialConfig {
        self.config
    }

    /// Trials requested by the caller.
    #[must_use]
    pub fn requested_trials(&self) -> u64 {
        self.trials
    }

    /// Strategy used to distribute trials.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// How the requested trials are split across workers.
    #[must_use]
    pub fn partition(&self) -> Partition {
        Partition::new(self.trials, self.strategy.workers())
    }

    /// Trials that will be counted once the run completes.
    #[must_use]
    pub fn effective_trials(&self) -> u64 {
        self.partition().effective_trials()
    }

    /// Runs every trial and aggregates the results.
    ///
    /// Blocks until every worker has finished. Any worker failure aborts the
    /// whole run; no partial statistics are produced.
    ///
    /// # Errors
    /// Returns [`SimulationError::Entropy`] when a worker cannot be seeded,
    /// [`SimulationError::WorkerSpawn`] or [`SimulationError::WorkerFailed`]
    /// when a worker cannot be started or does not finish,
    /// [`SimulationError::MalformedWorkerReport`] for unreadable worker
    /// output, and [`SimulationError::Statistics`] when fewer than two trials
    /// were counted.
    #[instrument(
        name = "harness.run",
        err,
        skip(self),
        fields(
            strategy = self.strategy.label(),
            workers = self.strategy.workers(),
            requested = self.trials,
            prisoners = self.config.prisoners(),
            max_cycle_length = self.config.max_cycle_length(),
            effective = field::Empty,
        ),
    )]
    pub fn run(&self) -> Result<RunReport> {
        let partition = self.partition();
        Span::current().record("effective", partition.effective_trials());
        if partition.effective_trials() == 0 {
            return Err(SimulationError::NoTrials {
                requested: self.trials,
                workers: partition.workers(),
            });
        }
        if partition.dropped_trials() > 0 {
            warn!(
                requested = self.trials,
                effective = partition.effective_trials(),
                dropped = partition.dropped_trials(),
                "trial count is not a multiple of the worker count; remainder dropped"
            );
        }

        let worker_successes = match self.strategy {
            ExecutionStrategy::Sequential => {
                vec![run_worker_trials(
                    "sequential",
                    0,
                    partition.per_worker(),
                    &self.config,
                )?]
            }
            ExecutionStrategy::Threads { .. } => threads::run(&self.config, partition)?,
            ExecutionStrategy::Processes { .. } => {
                let command = match &self.worker_command {
                    Some(command) => command.clone(),
                    None => WorkerCommand::current_exe()?,
                };
                processes::run(&self.config, partition, &command)?
            }
        };

        let successes: u64 = worker_successes.iter().sum();
        let statistics = aggregate(successes, partition.effective_trials())?;
        info!(
            label = self.strategy.label(),
            trials = statistics.trials(),
            successes,
            mean = statistics.mean(),
            "simulation completed"
        );
        Ok(RunReport {
            strategy: self.strategy,
            config: self.config,
            requested_trials: self.trials,
            worker_successes,
            statistics,
        })
    }
}

/// Runs one worker's share of trials with a freshly seeded random stream.
///
/// `kind` names the worker flavour ("thread", "process") in diagnostics.
pub(crate) fn run_worker_trials(
    kind: &'static str,
    index: usize,
    trials: u64,
    config: &TrialConfig,
) -> Result<u64> {
    let worker = format!("{kind} {}", index + 1);
    info!(worker = %worker, trials, "worker starting");
    let mut rng = RandomSource::seed()?;
    let successes = count_successes(config, &mut rng, trials);
    debug!(worker = %worker, trials, successes, "worker finished");
    Ok(successes)
}
