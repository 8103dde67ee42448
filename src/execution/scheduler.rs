//! Job scheduling - how many jobs run at once

use std::sync::Arc;
use tokio::sync::Semaphore;

/// Strategy for scheduling job execution
///
/// Steps inside a job are always sequential; this only governs jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// Run jobs one at a time, in declaration order
    Sequential,

    /// Run every job at once
    #[default]
    Parallel,

    /// Limited parallelism (max N concurrent jobs)
    LimitedParallel(usize),
}

/// Scheduler that hands out job execution slots
#[derive(Debug, Clone)]
pub struct ExecutionScheduler {
    strategy: SchedulingStrategy,
}

impl ExecutionScheduler {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self { strategy }
    }

    /// Number of jobs allowed to run concurrently, at least 1
    pub fn concurrency(&self, job_count: usize) -> usize {
        let limit = match self.strategy {
            SchedulingStrategy::Sequential => 1,
            SchedulingStrategy::Parallel => job_count,
            SchedulingStrategy::LimitedParallel(max) => max.min(job_count),
        };
        limit.max(1)
    }

    /// Semaphore with one permit per concurrent job slot
    pub fn slots(&self, job_count: usize) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.concurrency(job_count)))
    }
}
