//! Process-parallel execution.
//!
//! Every worker is a child process with its own address space. Its result
//! travels back over the stdout pipe created for it at spawn time, so no
//! memory is shared with the coordinator.

use std::{
    process::{Child, ExitStatus},
    sync::Arc,
};

use tracing::{debug, instrument, warn};

use crate::{
    Result,
    error::SimulationError,
    trial::TrialConfig,
    worker::{WorkerAssignment, WorkerCommand, parse_worker_report},
};

use super::Partition;

#[instrument(
    name = "harness.processes",
    err,
    skip(config, command),
    fields(
        workers = partition.workers(),
        per_worker = partition.per_worker(),
        program = %command.program().display(),
    ),
)]
pub(super) fn run(
    config: &TrialConfig,
    partition: Partition,
    command: &WorkerCommand,
) -> Result<Vec<u64>> {
    let children = spawn_all(config, partition, command)?;
    // Wait for every child before inspecting any result.
    let outputs: Vec<_> = children
        .into_iter()
        .map(|(worker, child)| (worker, child.wait_with_output()))
        .collect();

    outputs
        .into_iter()
        .map(|(worker, output)| {
            let output = output.map_err(|err| SimulationError::WorkerFailed {
                worker,
                message: Arc::from(format!("failed to wait for worker: {err}")),
            })?;
            check_status(worker, output.status)?;
            let successes = parse_worker_report(worker, &output.stdout)?;
            debug!(worker, successes, "worker process reported");
            Ok(successes)
        })
        .collect()
}

fn spawn_all(
    config: &TrialConfig,
    partition: Partition,
    command: &WorkerCommand,
) -> Result<Vec<(usize, Child)>> {
    let mut children = Vec::with_capacity(partition.workers());
    for index in 0..partition.workers() {
        let assignment = WorkerAssignment {
            index,
            trials: partition.per_worker(),
            config: *config,
        };
        match command.command_for(&assignment).spawn() {
            Ok(child) => children.push((index, child)),
            Err(err) => {
                reap(children);
                return Err(SimulationError::WorkerSpawn {
                    worker: index,
                    message: Arc::from(err.to_string()),
                });
            }
        }
    }
    Ok(children)
}

/// Terminates workers that were already started when a later spawn failed.
fn reap(children: Vec<(usize, Child)>) {
    for (worker, mut child) in children {
        if let Err(err) = child.kill() {
            warn!(worker, error = %err, "failed to kill worker process");
        }
        if let Err(err) = child.wait() {
            warn!(worker, error = %err, "failed to reap worker process");
        }
    }
}

fn check_status(worker: usize, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(SimulationError::WorkerFailed {
        worker,
        message: Arc::from(format!("worker process exited with {status}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn missing_program_is_a_spawn_failure() {
        let command = WorkerCommand::new("/nonexistent/prisoners-worker-binary");
        let err = run(&TrialConfig::default(), Partition::new(10, 2), &command)
            .expect_err("missing program must fail to spawn");
        assert!(matches!(err, SimulationError::WorkerSpawn { worker: 0, .. }));
    }

    #[cfg(unix)]
    #[rstest]
    fn failing_worker_aborts_the_run() {
        let command = WorkerCommand::new("/bin/sh").arg("-c").arg("exit 3");
        let err = run(&TrialConfig::default(), Partition::new(10, 2), &command)
            .expect_err("non-zero exit must fail the run");
        assert!(matches!(err, SimulationError::WorkerFailed { worker: 0, .. }));
    }

    #[cfg(unix)]
    #[rstest]
    fn garbage_output_is_malformed() {
        let command = WorkerCommand::new("/bin/sh").arg("-c").arg("echo hello");
        let err = run(&TrialConfig::default(), Partition::new(10, 2), &command)
            .expect_err("garbage output must be rejected");
        assert!(matches!(
            err,
            SimulationError::MalformedWorkerReport { worker: 0, .. }
        ));
    }

    #[cfg(unix)]
    #[rstest]
    fn reports_are_collected_in_worker_order() {
        let command = WorkerCommand::new("/bin/sh")
            .arg("-c")
            .arg("echo successes=$PRISONERS_WORKER_INDEX");
        let counts = run(&TrialConfig::default(), Partition::new(30, 3), &command)
            .expect("scripted workers must succeed");
        assert_eq!(counts, vec![0, 1, 2]);
    }
}
