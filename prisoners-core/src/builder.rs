//! Builder utilities for configuring simulation runs.
//!
//! Exposes the execution strategy selection surface and the validation
//! performed before constructing [`Simulation`] instances.

use crate::{
    Result,
    error::SimulationError,
    harness::Simulation,
    trial::{DEFAULT_PRISONERS, TrialConfig},
    worker::WorkerCommand,
};

/// Selects how a [`Simulation`] distributes its trials.
///
/// Parallel strategies give every worker `trials / workers` trials; the
/// remainder is dropped and the report states the effective trial count.
///
/// # Examples
/// ```
/// use prisoners_core::ExecutionStrategy;
///
/// let strategy = ExecutionStrategy::Threads { workers: 4 };
/// assert_eq!(strategy.workers(), 4);
/// assert_eq!(ExecutionStrategy::Sequential.workers(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Run every trial on the calling thread with a single random stream.
    #[default]
    Sequential,
    /// Run trials on a dedicated pool of worker threads.
    Threads {
        /// Number of worker threads.
        workers: usize,
    },
    /// Run trials in separate worker processes.
    Processes {
        /// Number of worker processes.
        workers: usize,
    },
}

impl ExecutionStrategy {
    /// Number of workers the trials are partitioned across.
    #[must_use]
    pub const fn workers(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Threads { workers } | Self::Processes { workers } => workers,
        }
    }

    /// Label used when reporting aggregate statistics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Threads { .. } => "all threads",
            Self::Processes { .. } => "all processes",
        }
    }
}

/// Configures and constructs [`Simulation`] instances.
///
/// # Examples
/// ```
/// use prisoners_core::{ExecutionStrategy, SimulationBuilder};
///
/// let simulation = SimulationBuilder::new()
///     .with_trials(1_000)
///     .with_execution_strategy(ExecutionStrategy::Threads { workers: 2 })
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(simulation.config().prisoners(), 100);
/// assert_eq!(simulation.config().max_cycle_length(), 50);
/// assert_eq!(simulation.effective_trials(), 1_000);
/// ```
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    prisoners: usize,
    max_cycle_length: Option<usize>,
    trials: u64,
    execution_strategy: ExecutionStrategy,
    worker_command: Option<WorkerCommand>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self {
            prisoners: DEFAULT_PRISONERS,
            max_cycle_length: None,
            trials: 10_000,
            execution_strategy: ExecutionStrategy::Sequential,
            worker_command: None,
        }
    }
}

impl SimulationBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use prisoners_core::{ExecutionStrategy, SimulationBuilder};
    ///
    /// let builder = SimulationBuilder::new();
    /// assert_eq!(builder.prisoners(), 100);
    /// assert_eq!(builder.max_cycle_length(), 50);
    /// assert_eq!(builder.trials(), 10_000);
    /// assert_eq!(builder.execution_strategy(), ExecutionStrategy::Sequential);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the number of prisoners (and boxes).
    #[must_use]
    pub fn with_prisoners(mut self, prisoners: usize) -> Self {
        self.prisoners = prisoners;
        self
    }

    /// Returns the configured number of prisoners.
    #[must_use]
    pub fn prisoners(&self) -> usize {
        self.prisoners
    }

    /// Overrides the number of boxes each prisoner may open.
    ///
    /// When unset, the budget is half the number of prisoners.
    ///
    /// # Examples
    /// ```
    /// use prisoners_core::SimulationBuilder;
    ///
    /// let builder = SimulationBuilder::new().with_prisoners(10);
    /// assert_eq!(builder.max_cycle_length(), 5);
    /// let builder = builder.with_max_cycle_length(9);
    /// assert_eq!(builder.max_cycle_length(), 9);
    /// ```
    #[must_use]
    pub fn with_max_cycle_length(mut self, max_cycle_length: usize) -> Self {
        self.max_cycle_length = Some(max_cycle_length);
        self
    }

    /// Returns the configured box budget.
    #[must_use]
    pub fn max_cycle_length(&self) -> usize {
        self.max_cycle_length.unwrap_or(self.prisoners / 2)
    }

    /// Overrides the requested number of trials.
    #[must_use]
    pub fn with_trials(mut self, trials: u64) -> Self {
        self.trials = trials;
        self
    }

    /// Returns the requested number of trials.
    #[must_use]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Sets the execution strategy to use when running.
    #[must_use]
    pub fn with_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    /// Returns the currently configured execution strategy.
    #[must_use]
    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.execution_strategy
    }

    /// Sets the command used to launch worker processes.
    ///
    /// Only consulted by [`ExecutionStrategy::Processes`]. Defaults to the
    /// current executable invoked with a `worker` argument.
    #[must_use]
    pub fn with_worker_command(mut self, command: WorkerCommand) -> Self {
        self.worker_command = Some(command);
        self
    }

    /// Validates the configuration and constructs a [`Simulation`].
    ///
    /// # Errors
    /// Returns [`SimulationError::InvalidPrisoners`] for zero prisoners,
    /// [`SimulationError::InvalidWorkerCount`] for a parallel strategy with
    /// zero workers, and [`SimulationError::NoTrials`] when partitioning
    /// leaves no trials to run.
    ///
    /// # Examples
    /// ```
    /// use prisoners_core::{ExecutionStrategy, SimulationBuilder, SimulationError};
    ///
    /// let err = SimulationBuilder::new()
    ///     .with_trials(2)
    ///     .with_execution_strategy(ExecutionStrategy::Threads { workers: 3 })
    ///     .build()
    ///     .expect_err("two trials cannot feed three workers");
    /// assert!(matches!(err, SimulationError::NoTrials { requested: 2, workers: 3 }));
    /// ```
    pub fn build(self) -> Result<Simulation> {
        let config = TrialConfig::new(self.prisoners, self.max_cycle_length())?;
        let workers = self.execution_strategy.workers();
        if workers == 0 {
            return Err(SimulationError::InvalidWorkerCount { got: workers });
        }
        if self.trials / workers as u64 == 0 {
            return Err(SimulationError::NoTrials {
                requested: self.trials,
                workers,
            });
        }
        Ok(Simulation::new(
            config,
            self.trials,
            self.execution_strategy,
            self.worker_command,
        ))
    }
}
