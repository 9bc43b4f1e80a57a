//! Thread-parallel execution on a dedicated Rayon pool.
//!
//! Each worker is handed exactly one result slot when it is spawned and
//! writes it once on completion. The pool scope is the completion barrier,
//! so slots are only read after every worker has returned.

use std::sync::Arc;

use rayon::ThreadPoolBuilder;
use tracing::{Dispatch, Span, dispatcher, instrument};

use crate::{Result, error::SimulationError, trial::TrialConfig};

use super::{Partition, run_worker_trials};

#[instrument(
    name = "harness.threads",
    err,
    skip(config),
    fields(workers = partition.workers(), per_worker = partition.per_worker()),
)]
pub(super) fn run(config: &TrialConfig, partition: Partition) -> Result<Vec<u64>> {
    let workers = partition.workers();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("prisoners-worker-{index}"))
        .build()
        .map_err(|err| SimulationError::WorkerSpawn {
            worker: 0,
            message: Arc::from(err.to_string()),
        })?;

    // Pool threads do not inherit the caller's subscriber or span.
    let dispatch = dispatcher::get_default(Dispatch::clone);
    let parent = Span::current();

    let mut slots: Vec<Option<Result<u64>>> = vec![None; workers];
    pool.scope(|scope| {
        for (index, slot) in slots.iter_mut().enumerate() {
            let worker_dispatch = dispatch.clone();
            let worker_span = parent.clone();
            scope.spawn(move |_| {
                dispatcher::with_default(&worker_dispatch, || {
                    worker_span.in_scope(|| {
                        *slot = Some(run_worker_trials(
                            "thread",
                            index,
                            partition.per_worker(),
                            config,
                        ));
                    });
                });
            });
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(worker, slot)| {
            slot.unwrap_or_else(|| {
                Err(SimulationError::WorkerFailed {
                    worker,
                    message: Arc::from("worker exited without writing its result"),
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(3)]
    fn every_worker_reports_a_slot(#[case] workers: usize) {
        let partition = Partition::new(30, workers);
        let slots = run(&TrialConfig::default(), partition).expect("threads must run");
        assert_eq!(slots.len(), workers);
        assert!(slots.iter().all(|&count| count <= partition.per_worker()));
    }

    #[rstest]
    fn generous_budget_counts_every_trial() {
        let config = TrialConfig::new(8, 8).expect("valid configuration");
        let partition = Partition::new(40, 4);
        let slots = run(&config, partition).expect("threads must run");
        assert_eq!(slots, vec![10; 4]);
    }
}
