//! Animation runner: ties together the surface database, the pipeline and
//! the VTK writer.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use quiver_compute::{ComputeBackend, CpuBackend, SerialBackend};
use quiver_core::animation::{render_animation, AnimationSetup, RenderSummary};
use quiver_core::params::GlobalParameters;
use quiver_core::source::SourceOpener;
use quiver_core::types::AnimationConfig;
use quiver_io::manifest::{AnimationManifest, MANIFEST_FILE};
use quiver_io::vtk::{VtkEncoding, VtkPointWriter};

/// Everything needed to render one animation.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub database: PathBuf,
    pub output: PathBuf,
    pub animation: AnimationConfig,
    pub encoding: VtkEncoding,
    pub manifest: bool,
    pub backend: String,
}

/// Render `job` into its output directory.
pub fn run_render(job: &RenderJob) -> Result<RenderSummary> {
    let opener = open_database(&job.database)?;
    let setup = prepare(opener.as_ref(), &job.animation)?;

    let writer = VtkPointWriter::new(&job.output, setup.sampling.points(), job.encoding)
        .with_context(|| format!("cannot prepare output directory '{}'", job.output.display()))?;
    let backend = create_backend(&job.backend, job.animation.workers)?;
    log::info!("Backend: {}", backend.device_info().name);

    let summary = render_animation(
        &setup,
        opener.as_ref(),
        &writer,
        backend.as_ref(),
        job.animation.workers,
    )?;

    if job.manifest {
        let path = job.output.join(MANIFEST_FILE);
        AnimationManifest::from_setup(&setup)
            .write(&path)
            .with_context(|| format!("cannot write '{}'", path.display()))?;
    }
    Ok(summary)
}

/// Build every shared table for `animation` without rendering.
pub fn run_validate(database: &Path, animation: &AnimationConfig) -> Result<AnimationSetup> {
    let opener = open_database(database)?;
    prepare(opener.as_ref(), animation)
}

/// Read the global parameters of a database.
pub fn run_info(database: &Path) -> Result<GlobalParameters> {
    let opener = open_database(database)?;
    let source = opener.open()?;
    GlobalParameters::read(source.as_ref())
        .with_context(|| format!("cannot read global parameters of '{}'", database.display()))
}

fn open_database(database: &Path) -> Result<Box<dyn SourceOpener>> {
    quiver_io::opener_for(database)
        .with_context(|| format!("cannot open surface database '{}'", database.display()))
}

fn prepare(opener: &dyn SourceOpener, animation: &AnimationConfig) -> Result<AnimationSetup> {
    let source = opener.open()?;
    AnimationSetup::prepare(source.as_ref(), animation)
        .with_context(|| format!("cannot set up animation from {}", opener.describe()))
}

/// Create the compute backend named by `preference`.
///
/// - `"serial"`: run every partition on the calling thread.
/// - `"cpu"`: a Rayon pool with `workers` threads.
/// - `"auto"` (default): serial for a single worker, CPU otherwise.
fn create_backend(preference: &str, workers: usize) -> Result<Box<dyn ComputeBackend>> {
    Ok(match preference {
        "serial" => Box::new(SerialBackend),
        "cpu" => Box::new(CpuBackend::with_threads(workers)?),
        "auto" if workers <= 1 => Box::new(SerialBackend),
        "auto" => Box::new(CpuBackend::with_threads(workers)?),
        other => bail!("unknown backend '{other}' (expected serial, cpu or auto)"),
    })
}
