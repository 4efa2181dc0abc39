//! Scoped worker pool for pairwise evaluations
//!
//! A [`WorkerPool`] owns a dedicated rayon thread pool sized for one Gram
//! computation. The threads are released when the pool is dropped, on success
//! and on every error path alike.

use crate::core::{PdkError, Result};
use log::{debug, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Number of execution units reported by the operating system
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Default worker count: one less than the available units, at least one
pub fn default_workers() -> usize {
    available_workers().saturating_sub(1).max(1)
}

/// Resolve a requested worker count against the machine's capacity
///
/// `None` selects [`default_workers`]; zero is rejected; anything above the
/// number of available units is clamped with a warning.
pub fn resolve_workers(requested: Option<usize>) -> Result<usize> {
    let cap = available_workers();
    match requested {
        None => Ok(default_workers()),
        Some(0) => Err(PdkError::InvalidParameter(
            "workers must be a positive whole number, got 0".to_string(),
        )),
        Some(n) if n > cap => {
            warn!("workers ({n}) exceeds available execution units ({cap}), using {cap}");
            Ok(cap)
        }
        Some(n) => Ok(n),
    }
}

/// Thread pool acquired for the duration of one parallel computation
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Acquire a pool with the resolved number of workers
    pub fn acquire(requested: Option<usize>) -> Result<Self> {
        let workers = resolve_workers(requested)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pdkernel-worker-{i}"))
            .build()
            .map_err(|e| PdkError::ResourceError(e.to_string()))?;
        debug!("acquired worker pool with {workers} threads");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item in parallel, keeping input order
    ///
    /// The first error stops further dispatch and is returned; no partial
    /// results escape.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Apply `f` to every index in `0..count` in parallel, keeping index order
    pub fn map_indices<R, F>(&self, count: usize, f: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> Result<R> + Sync + Send,
    {
        self.pool.install(|| (0..count).into_par_iter().map(f).collect())
    }
}
