//! Worker pools for round execution.
//!
//! A round hands the executor a list of independent tasks and blocks until
//! all of them have finished; results come back in submission order no
//! matter which worker finished first. The pool is built once by the caller
//! and passed down by reference.

use rayon::prelude::*;

/// Run a batch of independent tasks to completion.
pub trait TaskExecutor {
    /// Run `work` on every task and return the results in task order.
    /// Returns only after every task has completed.
    fn run_all<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send;

    /// Number of tasks that can make progress at once.
    fn workers(&self) -> usize;
}

/// Fixed-size rayon pool owned by the caller.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("gamma-worker-{}", i))
            .build()?;
        Ok(WorkerPool { pool })
    }
}

impl TaskExecutor for WorkerPool {
    fn run_all<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        // Indexed collect keeps submission order.
        self.pool
            .install(|| tasks.into_par_iter().map(&work).collect())
    }

    fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// Runs every task on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl TaskExecutor for SequentialExecutor {
    fn run_all<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        tasks.into_iter().map(work).collect()
    }

    fn workers(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pool_preserves_order() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.workers(), 4);
        let tasks: Vec<u64> = (0..100).collect();
        let out = pool.run_all(tasks, |t| {
            // Uneven work so completion order differs from submission order.
            std::thread::sleep(std::time::Duration::from_micros((100 - t) * 10));
            t * t
        });
        assert_eq!(out, (0..100).map(|t| t * t).collect::<Vec<_>>());
    }

    #[test]
    fn test_pool_borrows_round_snapshot() {
        let pool = WorkerPool::new(2).unwrap();
        let snapshot = vec![3usize, 1, 4, 1, 5];
        let calls = AtomicUsize::new(0);
        let out = pool.run_all(vec![0, 2, 4], |i| {
            calls.fetch_add(1, Ordering::Relaxed);
            snapshot[i]
        });
        assert_eq!(out, vec![3, 4, 5]);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_sequential_matches_pool() {
        let pool = WorkerPool::new(3).unwrap();
        let a = pool.run_all((0..17).collect::<Vec<i32>>(), |x| x - 3);
        let b = SequentialExecutor.run_all((0..17).collect::<Vec<i32>>(), |x| x - 3);
        assert_eq!(a, b);
    }
}
