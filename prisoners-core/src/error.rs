//! Error types for the prisoners core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced while constructing a [`crate::DisjointSet`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum UnionFindError {
    /// The structure was asked to track zero elements.
    #[error("a disjoint set must track at least one element")]
    Empty,
}

define_error_codes! {
    /// Stable codes describing [`UnionFindError`] variants.
    enum UnionFindErrorCode for UnionFindError {
        /// The structure was asked to track zero elements.
        Empty => Empty => "UNION_FIND_EMPTY",
    }
}

/// An error produced by [`crate::aggregate`] when the sample cannot support
/// the requested statistics.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StatisticsError {
    /// No trials were counted, so the mean is undefined.
    #[error("cannot aggregate statistics over zero trials")]
    NoTrials,
    /// The variance estimator divides by `trials - 1` and needs at least two
    /// trials.
    #[error("variance needs at least 2 trials (got {trials})")]
    InsufficientSamples {
        /// Number of trials that were supplied.
        trials: u64,
    },
    /// The success count cannot exceed the number of trials.
    #[error("success count {successes} exceeds trial count {trials}")]
    SuccessesExceedTrials {
        /// Number of successes that were supplied.
        successes: u64,
        /// Number of trials that were supplied.
        trials: u64,
    },
}

define_error_codes! {
    /// Stable codes describing [`StatisticsError`] variants.
    enum StatisticsErrorCode for StatisticsError {
        /// No trials were counted.
        NoTrials => NoTrials => "STATISTICS_NO_TRIALS",
        /// Fewer than two trials were counted.
        InsufficientSamples => InsufficientSamples { .. } => "STATISTICS_INSUFFICIENT_SAMPLES",
        /// More successes than trials were reported.
        SuccessesExceedTrials => SuccessesExceedTrials { .. } => "STATISTICS_SUCCESSES_EXCEED_TRIALS",
    }
}

/// Error type produced when configuring or running a [`crate::Simulation`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SimulationError {
    /// The number of prisoners (boxes) must be greater than zero.
    #[error("prisoners must be at least 1 (got {got})")]
    InvalidPrisoners {
        /// The invalid prisoner count supplied by the caller.
        got: usize,
    },
    /// A parallel strategy was configured without any workers.
    #[error("worker count must be at least 1 (got {got})")]
    InvalidWorkerCount {
        /// The invalid worker count supplied by the caller.
        got: usize,
    },
    /// Partitioning left no trials to run.
    #[error("{requested} trials across {workers} workers leaves no trials to run")]
    NoTrials {
        /// Trial count requested by the caller.
        requested: u64,
        /// Number of workers the trials were partitioned across.
        workers: usize,
    },
    /// The operating system entropy source could not supply a seed.
    #[error("failed to read a seed from the OS entropy source: {message}")]
    Entropy {
        /// Description of the underlying entropy failure.
        message: Arc<str>,
    },
    /// A worker thread or process could not be created.
    #[error("failed to start worker {worker}: {message}")]
    WorkerSpawn {
        /// Zero-based index of the worker that failed to start.
        worker: usize,
        /// Description of the underlying failure.
        message: Arc<str>,
    },
    /// A worker did not complete successfully.
    #[error("worker {worker} failed: {message}")]
    WorkerFailed {
        /// Zero-based index of the failed worker.
        worker: usize,
        /// Description of the failure, such as the exit status.
        message: Arc<str>,
    },
    /// A worker process produced output that is not a valid report.
    #[error("worker {worker} produced a malformed report: {message}")]
    MalformedWorkerReport {
        /// Zero-based index of the worker.
        worker: usize,
        /// Why the report could not be parsed.
        message: Arc<str>,
    },
    /// A worker process was started without a valid assignment.
    #[error("worker environment variable `{variable}` is invalid: {message}")]
    WorkerEnvironment {
        /// Name of the offending environment variable.
        variable: &'static str,
        /// Why the value was rejected.
        message: Arc<str>,
    },
    /// A worker process could not write its report.
    #[error("failed to write worker report: {message}")]
    WorkerOutput {
        /// Description of the underlying I/O failure.
        message: Arc<str>,
    },
    /// The aggregated counts could not be turned into statistics.
    #[error("statistics unavailable: {error}")]
    Statistics {
        #[source]
        /// Underlying aggregation error.
        error: StatisticsError,
    },
}

define_error_codes! {
    /// Stable codes describing [`SimulationError`] variants.
    enum SimulationErrorCode for SimulationError {
        /// The number of prisoners must be greater than zero.
        InvalidPrisoners => InvalidPrisoners { .. } => "SIMULATION_INVALID_PRISONERS",
        /// A parallel strategy was configured without any workers.
        InvalidWorkerCount => InvalidWorkerCount { .. } => "SIMULATION_INVALID_WORKER_COUNT",
        /// Partitioning left no trials to run.
        NoTrials => NoTrials { .. } => "SIMULATION_NO_TRIALS",
        /// The OS entropy source could not supply a seed.
        Entropy => Entropy { .. } => "SIMULATION_ENTROPY_UNAVAILABLE",
        /// A worker thread or process could not be created.
        WorkerSpawn => WorkerSpawn { .. } => "SIMULATION_WORKER_SPAWN",
        /// A worker did not complete successfully.
        WorkerFailed => WorkerFailed { .. } => "SIMULATION_WORKER_FAILED",
        /// A worker process produced a malformed report.
        MalformedWorkerReport => MalformedWorkerReport { .. } => "SIMULATION_MALFORMED_WORKER_REPORT",
        /// A worker process was started without a valid assignment.
        WorkerEnvironment => WorkerEnvironment { .. } => "SIMULATION_WORKER_ENVIRONMENT",
        /// A worker process could not write its report.
        WorkerOutput => WorkerOutput { .. } => "SIMULATION_WORKER_OUTPUT",
        /// The aggregated counts could not be turned into statistics.
        StatisticsFailure => Statistics { .. } => "SIMULATION_STATISTICS_FAILURE",
    }
}

impl SimulationError {
    /// Retrieve the inner [`StatisticsErrorCode`] when the error originated in
    /// aggregation.
    #[must_use]
    pub const fn statistics_code(&self) -> Option<StatisticsErrorCode> {
        match self {
            Self::Statistics { error } => Some(error.code()),
            _ => None,
        }
    }
}

impl From<StatisticsError> for SimulationError {
    fn from(error: StatisticsError) -> Self {
        Self::Statistics { error }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, SimulationError>;
