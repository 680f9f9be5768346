//! # Quiver Compute
//!
//! Worker-pool abstraction for the Quiver pipeline. Frame rendering is
//! embarrassingly parallel: every planned time step is reconstructed on its
//! own. The [`ComputeBackend`](backend::ComputeBackend) trait hides how those
//! independent partitions are scheduled so `quiver-core` stays executor
//! agnostic.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Status |
//! |---------|-------------|--------|
//! | Serial (calling thread) | always | Implemented |
//! | CPU (Rayon) | `cpu` (default) | Implemented |

pub mod backend;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, PartitionTask, SerialBackend};

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
