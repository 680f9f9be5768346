//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over execution environments so that
//! the reconstruction code in `quiver-core` never touches thread pools
//! directly. A backend receives a number of partitions and a task closure;
//! each partition is run exactly once and partitions share nothing mutable.

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Failed to build worker pool with {threads} threads: {message}")]
    PoolBuild { threads: usize, message: String },

    #[error("Partition {partition} failed: {source}")]
    TaskFailed {
        partition: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ComputeError {
    /// Wrap a task error raised while processing `partition`.
    pub fn task<E>(partition: usize, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TaskFailed {
            partition,
            source: Box::new(err),
        }
    }
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    /// Number of workers that may run partitions concurrently.
    pub workers: usize,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Serial,
    Cpu,
}

/// A unit of partitioned work. Receives the partition index.
pub type PartitionTask<'a> = dyn Fn(usize) -> Result<(), ComputeError> + Send + Sync + 'a;

/// Abstraction over compute backends.
///
/// Implementations run `task(p)` for every `p` in `0..partitions`, in any
/// order and possibly concurrently. The first failing partition aborts the
/// run and its error is returned; results of other partitions are not merged
/// because every partition writes its own artefacts.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Run `task` once for each partition index.
    fn run_partitions(&self, partitions: usize, task: &PartitionTask<'_>) -> Result<(), ComputeError>;
}

/// Runs every partition on the calling thread, in index order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            workers: 1,
        }
    }

    fn run_partitions(&self, partitions: usize, task: &PartitionTask<'_>) -> Result<(), ComputeError> {
        (0..partitions).try_for_each(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_serial_runs_partitions_in_order() {
        let seen = Mutex::new(Vec::new());
        SerialBackend
            .run_partitions(4, &|p| {
                seen.lock().unwrap().push(p);
                Ok(())
            })
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_serial_stops_at_first_failure() {
        let seen = Mutex::new(Vec::new());
        let err = SerialBackend
            .run_partitions(4, &|p| {
                seen.lock().unwrap().push(p);
                if p == 1 {
                    Err(ComputeError::task(p, Boom))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, ComputeError::TaskFailed { partition: 1, .. }));
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
