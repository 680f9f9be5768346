//! Pipeline-level error kinds.

use quiver_compute::ComputeError;
use thiserror::Error;

use crate::sink::SinkError;
use crate::source::SourceError;

/// Errors raised while preparing or rendering an animation.
///
/// Setup errors (reading parameters, sampling, locating) abort before any
/// worker starts. Per-frame errors abort the worker that raised them.
#[derive(Debug, Error)]
pub enum QuiverError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Distance {distance:.6} rad exceeds the mesh extent {max_extent:.6} rad")]
    OutOfRange { distance: f64, max_extent: f64 },

    #[error("Data source error: {0}")]
    DataSource(#[from] SourceError),

    #[error("Frame sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}

impl QuiverError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
