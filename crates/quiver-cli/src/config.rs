//! TOML job files for `quiver run`.
//!
//! ```toml
//! [input]
//! database = "axisem3d_surface.nc"
//!
//! [sampling]
//! spacing_km = 100.0
//! min_dist_deg = 0.0
//! max_dist_deg = 180.0
//!
//! [time]
//! start = 0.0
//! interval = 20.0
//! snapshots = 50
//!
//! [output]
//! directory = "./animation"
//! encoding = "binary"
//!
//! [compute]
//! workers = 4
//! backend = "cpu"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use quiver_core::types::{AnimationConfig, SamplingParams, TimeWindow};
use quiver_io::vtk::VtkEncoding;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub input: InputConfig,
    pub sampling: SamplingConfig,
    pub time: TimeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub compute: ComputeConfig,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    /// Surface database: a `.nc` file or a bundle directory.
    pub database: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct SamplingConfig {
    /// Spacing between surface points in km.
    pub spacing_km: f64,
    #[serde(default)]
    pub min_dist_deg: f64,
    #[serde(default = "default_max_dist")]
    pub max_dist_deg: f64,
}

fn default_max_dist() -> f64 {
    180.0
}

#[derive(Debug, Deserialize)]
pub struct TimeConfig {
    /// Time of the first snapshot (s).
    pub start: f64,
    /// Time between snapshots (s).
    pub interval: f64,
    pub snapshots: usize,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the VTK files (default: "./animation").
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default)]
    pub encoding: VtkEncoding,
    /// Also write `animation.json` (default: true).
    #[serde(default = "default_true")]
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            encoding: VtkEncoding::default(),
            manifest: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./animation")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ComputeConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// "serial", "cpu" or "auto" (default).
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            backend: default_backend(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_backend() -> String {
    "auto".into()
}

impl JobConfig {
    /// Pipeline configuration; spacing is converted from km to metres.
    pub fn animation(&self) -> AnimationConfig {
        AnimationConfig {
            sampling: SamplingParams {
                min_dist_deg: self.sampling.min_dist_deg,
                max_dist_deg: self.sampling.max_dist_deg,
                spacing: self.sampling.spacing_km * 1e3,
            },
            window: TimeWindow {
                start_time: self.time.start,
                interval: self.time.interval,
                snapshots: self.time.snapshots,
            },
            workers: self.compute.workers.max(1),
        }
    }

    /// Resolve relative input/output paths against `base`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        if self.input.database.is_relative() {
            self.input.database = base.join(&self.input.database);
        }
        if self.output.directory.is_relative() {
            self.output.directory = base.join(&self.output.directory);
        }
        self
    }
}

/// Load and parse a TOML job configuration file.
///
/// Relative paths inside the file are taken relative to its directory.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read job file '{}'", path.display()))?;
    let config: JobConfig =
        toml::from_str(&content).with_context(|| format!("invalid job file '{}'", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.relative_to(base))
}
