//! Prisoners core library.
//!
//! Estimates the success probability of the cycle-following strategy for the
//! 100 prisoners problem by Monte Carlo simulation, sequentially or across
//! worker threads or processes.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod error;
mod harness;
mod rng;
mod statistics;
mod trial;
mod union_find;
mod worker;

pub use crate::{
    builder::{ExecutionStrategy, SimulationBuilder},
    error::{
        Result, SimulationError, SimulationErrorCode, StatisticsError, StatisticsErrorCode,
        UnionFindError, UnionFindErrorCode,
    },
    harness::{Partition, RunReport, Simulation},
    rng::{BoundedDraw, RandomSource},
    statistics::{ConfidenceInterval, StatisticsReport, aggregate},
    trial::{
        DEFAULT_PRISONERS, TrialConfig, TrialOutcome, analytic_success_probability,
        count_successes, run_trial,
    },
    union_find::DisjointSet,
    worker::{
        WORKER_INDEX_ENV, WORKER_MAX_CYCLE_ENV, WORKER_PRISONERS_ENV, WORKER_TRIALS_ENV,
        WorkerAssignment, WorkerCommand, format_worker_report, parse_worker_report, serve_worker,
    },
};
