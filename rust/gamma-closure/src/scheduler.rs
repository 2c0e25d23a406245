//! Round construction and execution.
//!
//! A round's work list is cut into contiguous batches, one task per batch.
//! Tasks only read the round snapshot (lifted generators, `successful`,
//! strategy, anchor cursor); results are concatenated in batch order, so
//! the set and order of a round's successes does not depend on scheduling.

use crate::escalation::Strategy;
use crate::evaluator::{evaluate_candidate, evaluate_single, LiftedSet};
use crate::pool::TaskExecutor;
use crate::report::Witness;
use gamma_core::GroupArithmetic;

/// One unit of parallel work.
#[derive(Debug, Clone, Copy)]
pub struct Task<'a> {
    /// Contiguous slice of the round's work list.
    pub batch: &'a [usize],
    /// `successful` as of round start.
    pub successful: &'a [usize],
    /// `None` for the initial single-generator pass.
    pub strategy: Option<Strategy>,
    pub anchor_cursor: usize,
}

/// Result of testing one candidate in a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub index: usize,
    pub products_tested: u64,
    /// `Some` if the candidate qualified.
    pub witness: Option<Witness>,
}

/// Everything a round produced, in batch-submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub attempts: Vec<Attempt>,
    pub tasks: usize,
}

impl RoundOutcome {
    /// Indices that qualified this round, in submission order.
    pub fn successes(&self) -> impl Iterator<Item = usize> + '_ {
        self.attempts
            .iter()
            .filter(|a| a.witness.is_some())
            .map(|a| a.index)
    }

    pub fn success_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.witness.is_some()).count()
    }

    pub fn products_tested(&self) -> u64 {
        self.attempts.iter().map(|a| a.products_tested).sum()
    }
}

/// Split `work` into tasks of at most `batch_size` candidates.
pub fn build_tasks<'a>(
    work: &'a [usize],
    successful: &'a [usize],
    strategy: Option<Strategy>,
    anchor_cursor: usize,
    batch_size: usize,
) -> Vec<Task<'a>> {
    work.chunks(batch_size.max(1))
        .map(|batch| Task {
            batch,
            successful,
            strategy,
            anchor_cursor,
        })
        .collect()
}

fn run_task<A: GroupArithmetic>(lifted: &LiftedSet<'_, A>, task: Task<'_>) -> Vec<Attempt> {
    task.batch
        .iter()
        .map(|&index| match task.strategy {
            None => Attempt {
                index,
                products_tested: 1,
                witness: evaluate_single(lifted, index).then_some(Witness::Direct),
            },
            Some(strategy) => {
                let eval = evaluate_candidate(
                    lifted,
                    index,
                    task.successful,
                    task.anchor_cursor,
                    strategy,
                );
                Attempt {
                    index,
                    products_tested: eval.products_tested,
                    witness: eval.hit.map(|arrangement| Witness::Combination {
                        strategy,
                        arrangement,
                    }),
                }
            }
        })
        .collect()
}

/// Submit every task, wait for all of them, concatenate in batch order.
pub fn run_round<A, E>(executor: &E, lifted: &LiftedSet<'_, A>, tasks: Vec<Task<'_>>) -> RoundOutcome
where
    A: GroupArithmetic,
    E: TaskExecutor,
{
    let task_count = tasks.len();
    let results = executor.run_all(tasks, |task| run_task(lifted, task));
    RoundOutcome {
        attempts: results.into_iter().flatten().collect(),
        tasks: task_count,
    }
}

/// Test every generator on its own.
pub fn collect_initial_round<A, E>(
    executor: &E,
    lifted: &LiftedSet<'_, A>,
    batch_size: usize,
) -> RoundOutcome
where
    A: GroupArithmetic,
    E: TaskExecutor,
{
    let work: Vec<usize> = (0..lifted.len()).collect();
    let tasks = build_tasks(&work, &[], None, 0, batch_size);
    run_round(executor, lifted, tasks)
}

/// Test `work` against the `successful` snapshot under `strategy`.
///
/// Pure with respect to the snapshot: calling it twice with the same inputs
/// yields the same outcome.
pub fn collect_round<A, E>(
    executor: &E,
    lifted: &LiftedSet<'_, A>,
    work: &[usize],
    successful: &[usize],
    strategy: Strategy,
    anchor_cursor: usize,
    batch_size: usize,
) -> RoundOutcome
where
    A: GroupArithmetic,
    E: TaskExecutor,
{
    let tasks = build_tasks(work, successful, Some(strategy), anchor_cursor, batch_size);
    run_round(executor, lifted, tasks)
}
