//! Configuration records and result containers shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Spatial sampling of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Minimum epicentral distance (degrees).
    pub min_dist_deg: f64,
    /// Maximum epicentral distance (degrees).
    pub max_dist_deg: f64,
    /// Target spacing between neighbouring points, in the same length unit
    /// as the outer radius (metres for solver databases).
    pub spacing: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            min_dist_deg: 0.0,
            max_dist_deg: 180.0,
            spacing: 100_000.0,
        }
    }
}

/// Requested animation window in solver time units (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Time of the first snapshot.
    pub start_time: f64,
    /// Time between consecutive snapshots.
    pub interval: f64,
    /// Number of snapshots requested.
    pub snapshots: usize,
}

/// Everything the pipeline needs besides the data itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    pub sampling: SamplingParams,
    pub window: TimeWindow,
    /// Number of parallel workers (values below one are treated as one).
    pub workers: usize,
}

/// One reconstructed displacement field.
///
/// `displacement[i]` belongs to station `i` of the
/// [`SurfaceSampling`](crate::sampling::SurfaceSampling) the frame was built
/// from; the correspondence is by position alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position of this frame in the time-step plan.
    pub ordinal: usize,
    /// Solver time-step index.
    pub step: usize,
    /// Physical time of the step (seconds).
    pub time: f64,
    /// Cartesian displacement per station.
    pub displacement: Vec<[f64; 3]>,
}
