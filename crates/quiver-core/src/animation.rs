//! Animation driver: one-off setup followed by parallel frame rendering.
//!
//! Setup (parameters, sampling, element location, time planning) runs once
//! on the calling thread and fails fast: no worker starts unless every
//! shared table was built. Rendering then partitions the plan round-robin
//! over the backend's workers. Each worker opens its own source handle and
//! streams its frames to the shared sink.

use std::time::{Duration, Instant};

use quiver_compute::{ComputeBackend, ComputeError};

use crate::error::QuiverError;
use crate::locate::InterpolationTable;
use crate::params::GlobalParameters;
use crate::reconstruct::FrameReconstructor;
use crate::sampling::SurfaceSampling;
use crate::sink::FrameSink;
use crate::source::{SourceOpener, SurfaceSource};
use crate::timesteps::{PlannedStep, TimeStepPlan};
use crate::types::{AnimationConfig, Frame};

/// Read-only tables shared by every worker.
#[derive(Debug, Clone)]
pub struct AnimationSetup {
    pub params: GlobalParameters,
    pub sampling: SurfaceSampling,
    pub table: InterpolationTable,
    pub plan: TimeStepPlan,
}

/// Outcome of [`render_animation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub frames: usize,
    pub workers: usize,
    pub elapsed: Duration,
}

impl AnimationSetup {
    /// Build all shared tables from `source` and `config`.
    pub fn prepare(source: &dyn SurfaceSource, config: &AnimationConfig) -> Result<Self, QuiverError> {
        let clock = Instant::now();
        log::info!("Reading global parameters...");
        let params = GlobalParameters::read(source)?;
        log::info!(
            "Reading global parameters done, {:.3} sec elapsed. {} elements, {} nodes per edge, {} time steps",
            clock.elapsed().as_secs_f64(),
            params.element_count(),
            params.nodes_per_edge(),
            params.time.step_count
        );

        Self::from_parameters(params, config)
    }

    /// Build the sampling, interpolation table and plan for known parameters.
    pub fn from_parameters(params: GlobalParameters, config: &AnimationConfig) -> Result<Self, QuiverError> {
        let clock = Instant::now();
        log::info!("Sampling surface...");
        let sampling = SurfaceSampling::new(&config.sampling, params.outer_radius)?;
        log::info!("    Number of distances: {}", sampling.distance_count());
        log::info!("    Number of sampling points: {}", sampling.station_count());
        log::info!(
            "Sampling surface done, {:.3} sec elapsed.",
            clock.elapsed().as_secs_f64()
        );

        let clock = Instant::now();
        log::info!("Locating points in distance...");
        let table = InterpolationTable::build(sampling.distances(), &params)?;
        log::info!(
            "Locating points in distance done, {:.3} sec elapsed.",
            clock.elapsed().as_secs_f64()
        );

        let clock = Instant::now();
        log::info!("Preparing timesteps...");
        let plan = TimeStepPlan::new(&config.window, &params.time)?;
        log::info!("    Number of snapshots: {}", plan.len());
        log::info!(
            "Preparing timesteps done, {:.3} sec elapsed.",
            clock.elapsed().as_secs_f64()
        );

        Ok(Self {
            params,
            sampling,
            table,
            plan,
        })
    }

    /// Reconstructor over this setup's tables.
    pub fn reconstructor(&self) -> Result<FrameReconstructor<'_>, QuiverError> {
        FrameReconstructor::new(&self.sampling, &self.table)
    }

    /// Reconstruct a single planned frame.
    pub fn render_frame(&self, source: &mut dyn SurfaceSource, planned: PlannedStep) -> Result<Frame, QuiverError> {
        let displacement = self.reconstructor()?.reconstruct(source, planned.step)?;
        Ok(Frame {
            ordinal: planned.ordinal,
            step: planned.step,
            time: planned.time,
            displacement,
        })
    }
}

/// Render every planned frame of `setup` into `sink`.
///
/// `workers` partitions are requested from `backend` (never more than there
/// are frames). The first failing worker aborts the render and its error is
/// returned as-is.
pub fn render_animation(
    setup: &AnimationSetup,
    opener: &dyn SourceOpener,
    sink: &dyn FrameSink,
    backend: &dyn ComputeBackend,
    workers: usize,
) -> Result<RenderSummary, QuiverError> {
    let clock = Instant::now();
    let total = setup.plan.len();
    if total == 0 {
        log::warn!("Time-step plan is empty; no frames rendered");
        return Ok(RenderSummary {
            frames: 0,
            workers: 0,
            elapsed: clock.elapsed(),
        });
    }
    let workers = workers.clamp(1, total);
    // Validate shared tables before fanning out.
    setup.reconstructor()?;

    log::info!(
        "Generating {} snapshots on {} with {} workers...",
        total,
        backend.device_info().name,
        workers
    );
    let task = |worker: usize| -> Result<(), ComputeError> {
        render_partition(setup, opener, sink, worker, workers).map_err(|e| ComputeError::task(worker, e))
    };
    backend.run_partitions(workers, &task).map_err(unwrap_task_error)?;

    let elapsed = clock.elapsed();
    log::info!(
        "Generating snapshots done, {:.3} sec elapsed.",
        elapsed.as_secs_f64()
    );
    Ok(RenderSummary {
        frames: total,
        workers,
        elapsed,
    })
}

fn render_partition(
    setup: &AnimationSetup,
    opener: &dyn SourceOpener,
    sink: &dyn FrameSink,
    worker: usize,
    workers: usize,
) -> Result<(), QuiverError> {
    log::debug!("Worker {} opening {}", worker, opener.describe());
    let mut source = opener.open()?;
    let total = setup.plan.len();
    for planned in setup.plan.partition(worker, workers) {
        let frame = setup.render_frame(source.as_mut(), planned)?;
        sink.write_frame(&frame)?;
        log::info!(
            "    Done with snapshot t = {:.6} s; tstep = {} / {}; worker = {}",
            planned.time,
            planned.ordinal + 1,
            total,
            worker
        );
    }
    Ok(())
}

/// Recover the pipeline error carried by a failed partition.
fn unwrap_task_error(err: ComputeError) -> QuiverError {
    match err {
        ComputeError::TaskFailed { partition, source } => match source.downcast::<QuiverError>() {
            Ok(inner) => *inner,
            Err(other) => QuiverError::Compute(ComputeError::TaskFailed {
                partition,
                source: other,
            }),
        },
        other => QuiverError::Compute(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use crate::source::{names, InMemorySurface};
    use crate::types::{SamplingParams, TimeWindow};
    use ndarray::Array2;
    use num_complex::Complex64;
    use quiver_compute::SerialBackend;
    use std::f64::consts::PI;

    fn surface() -> InMemorySurface {
        let nele = 4;
        let width = PI / nele as f64;
        let steps = 5;
        let npe = 3;
        let orders = 2;
        let coefficients = (0..nele)
            .map(|e| {
                Array2::from_shape_fn((steps, 3 * npe * orders), |(t, i)| {
                    Complex64::new((e + t + i) as f64 * 0.01, (i as f64 - t as f64) * 0.02)
                })
            })
            .collect();
        InMemorySurface {
            time_points: (0..steps).map(|t| t as f64 * 2.0).collect(),
            element_bounds: (0..nele)
                .map(|e| {
                    let upper = if e + 1 == nele { PI } else { (e + 1) as f64 * width };
                    [e as f64 * width, upper]
                })
                .collect(),
            interior_nodes: vec![-1.0, 0.0, 1.0],
            boundary_nodes: vec![-1.0, 0.3, 1.0],
            coefficients,
            ..Default::default()
        }
        .with_attribute(names::RADIUS, 1000.0)
        .with_attribute(names::SOURCE_LATITUDE, 0.0)
        .with_attribute(names::SOURCE_LONGITUDE, 0.0)
        .with_attribute(names::SOURCE_DEPTH, 0.0)
        .with_attribute(names::SOURCE_FLATTENING, 0.0)
        .with_attribute(names::SURFACE_FLATTENING, 0.0)
    }

    fn config() -> AnimationConfig {
        AnimationConfig {
            sampling: SamplingParams {
                min_dist_deg: 0.0,
                max_dist_deg: 180.0,
                spacing: 300.0,
            },
            window: TimeWindow {
                start_time: 2.0,
                interval: 2.0,
                snapshots: 10,
            },
            workers: 1,
        }
    }

    #[test]
    fn test_prepare_and_render_serially() {
        let surface = surface();
        let setup = AnimationSetup::prepare(&surface, &config()).unwrap();
        assert_eq!(setup.plan.steps(), &[1, 2, 3, 4]);

        let sink = CollectingSink::with_stations(setup.sampling.station_count());
        let summary = render_animation(&setup, &surface, &sink, &SerialBackend, 2).unwrap();
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.workers, 2);

        let frames = sink.into_frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3].step, 4);
        assert_eq!(frames[3].time, 8.0);
    }

    #[test]
    fn test_setup_fails_before_rendering_on_bad_spacing() {
        let mut cfg = config();
        cfg.sampling.spacing = 0.0;
        assert!(matches!(
            AnimationSetup::prepare(&surface(), &cfg),
            Err(QuiverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_worker_error_is_propagated() {
        let mut broken = surface();
        let setup = AnimationSetup::prepare(&broken, &config()).unwrap();
        broken.coefficients[2] = Array2::zeros((5, 7));

        let sink = CollectingSink::new();
        let err = render_animation(&setup, &broken, &sink, &SerialBackend, 1).unwrap_err();
        assert!(matches!(err, QuiverError::DataSource(_)), "got {err}");
    }
}
