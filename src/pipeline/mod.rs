//! Concurrency orchestration.
//!
//! Two independent levels of parallelism, both optional:
//!
//! * **Header decoding** within one chunk of a file.  Each decode is a pure
//!   function over a disjoint 240-byte range.
//! * **File scanning**, one task per file.
//!
//! Both run on a bounded [`WorkerPool`].  A pool always hands results back
//! in input order, whatever order the workers finish in, because the shot
//! segmentation downstream depends on on-disk trace order.  A pool of one
//! worker (or a build without the `parallel` feature) runs everything inline
//! on the calling thread and produces identical results.
//!
//! The non-blocking variants in [`nonblocking`] (feature `async`) drive the
//! same engine from tokio tasks.

#[cfg(feature = "async")]
pub mod nonblocking;

use serde::{Deserialize, Serialize};

use crate::error::Result;
#[cfg(feature = "parallel")]
use crate::error::SegyError;

/// Worker limits for the two levels of parallelism.  `1` means sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concurrency {
    /// Files scanned at the same time.
    pub file_workers:   usize,
    /// Trace headers decoded at the same time within one chunk.
    pub header_workers: usize,
}

impl Concurrency {
    pub fn sequential() -> Self {
        Self { file_workers: 1, header_workers: 1 }
    }

    pub fn threads(n: usize) -> Self {
        let n = n.max(1);
        Self { file_workers: n, header_workers: n }
    }

    pub fn is_sequential(&self) -> bool {
        self.file_workers <= 1 && self.header_workers <= 1
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::threads(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

/// Bounded pool that maps an index range to results in index order.
pub struct WorkerPool {
    workers: usize,
    #[cfg(feature = "parallel")]
    pool:    Option<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Inline execution on the calling thread.
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// A pool of `workers` threads; `0` or `1` gives [`WorkerPool::sequential`].
    pub fn new(workers: usize) -> Result<Self> {
        if workers <= 1 {
            return Ok(Self::sequential());
        }
        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("segy-worker-{i}"))
                .build()
                .map_err(|e| SegyError::Task(e.to_string()))?;
            Ok(Self { workers, pool: Some(pool) })
        }
        #[cfg(not(feature = "parallel"))]
        {
            Ok(Self::sequential())
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluate `f(0) .. f(n - 1)` and return the results in index order.
    ///
    /// On error the first failing index's error (in index order) is
    /// returned and no partial output escapes.
    pub fn map_ordered<U, F>(&self, n: usize, f: F) -> Result<Vec<U>>
    where
        U: Send,
        F: Fn(usize) -> Result<U> + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            use rayon::prelude::*;
            // Indexed collect writes each result into its own slot, so
            // completion order never leaks into the output order.
            return pool.install(|| (0..n).into_par_iter().map(&f).collect());
        }
        (0..n).map(f).collect()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("workers", &self.workers).finish()
    }
}
