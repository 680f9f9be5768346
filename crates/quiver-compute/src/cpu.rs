//! CPU compute backend using Rayon for shared-memory parallelism.

use rayon::prelude::*;

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, PartitionTask};

/// CPU backend that runs partitions on a dedicated Rayon thread pool.
pub struct CpuBackend {
    num_threads: usize,
    pool: rayon::ThreadPool,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Result<Self, ComputeError> {
        Self::with_threads(rayon::current_num_threads())
    }

    /// Create a CPU backend with a specified thread count (at least one).
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let num_threads = num_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("quiver-worker-{i}"))
            .build()
            .map_err(|e| ComputeError::PoolBuild {
                threads: num_threads,
                message: e.to_string(),
            })?;
        Ok(Self { num_threads, pool })
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            workers: self.num_threads,
        }
    }

    fn run_partitions(&self, partitions: usize, task: &PartitionTask<'_>) -> Result<(), ComputeError> {
        log::debug!(
            "Dispatching {} partitions on {} threads",
            partitions,
            self.num_threads
        );
        self.pool
            .install(|| (0..partitions).into_par_iter().try_for_each(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_every_partition_runs_once() {
        let backend = CpuBackend::with_threads(3).unwrap();
        let hits: Vec<AtomicUsize> = (0..8).map(|_| AtomicUsize::new(0)).collect();
        backend
            .run_partitions(8, &|p| {
                hits[p].fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert!(hits.iter().all(|h| h.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn test_zero_threads_clamps_to_one() {
        let backend = CpuBackend::with_threads(0).unwrap();
        assert_eq!(backend.device_info().workers, 1);
        assert_eq!(backend.device_info().backend_type, BackendType::Cpu);
    }
}
