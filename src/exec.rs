//! Bounded worker pool shared by every parallel operation.
//!
//! One explicitly constructed pool caps total concurrency across nested
//! fan-out (overlap spawns per-repertoire sorts which spawn merge pairs);
//! nothing in the crate spawns unmanaged threads. Shutdown is the owner
//! dropping the pool.

use crate::{ClonescanError, Result};
use rayon::prelude::*;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with the given thread count; 0 means one per CPU.
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 {
            num_cpus::get()
        } else {
            threads
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| ClonescanError::Task(format!("thread pool build: {}", e)))?;

        Ok(WorkerPool { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Submit independent tasks and join them all. Results come back in
    /// submission order. Every task runs to completion even when a sibling
    /// fails; the first failure (in submission order) then fails the whole
    /// join, after side effects have drained.
    pub fn run_all<T, F>(&self, tasks: Vec<F>) -> Result<Vec<T>>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        let results: Vec<Result<T>> =
            self.pool.install(|| tasks.into_par_iter().map(|task| task()).collect());

        results.into_iter().collect()
    }
}
