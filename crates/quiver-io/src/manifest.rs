//! `animation.json`: an index of the frames written for one render.
//!
//! Lets a viewer map frame files back to solver steps and physical times
//! without parsing the VTK files themselves.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use quiver_core::animation::AnimationSetup;
use quiver_core::sink::SinkError;

use crate::vtk::{frame_file_name, TITLE};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "animation.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub ordinal: usize,
    pub step: usize,
    pub time: f64,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationManifest {
    pub title: String,
    /// Number of points per frame.
    pub stations: usize,
    /// Sampled epicentral distances (radians).
    pub distances: Vec<f64>,
    pub frames: Vec<ManifestEntry>,
}

impl AnimationManifest {
    /// Describe every frame planned by `setup`.
    pub fn from_setup(setup: &AnimationSetup) -> Self {
        Self {
            title: TITLE.to_string(),
            stations: setup.sampling.station_count(),
            distances: setup.sampling.distances().to_vec(),
            frames: setup
                .plan
                .iter()
                .map(|p| ManifestEntry {
                    ordinal: p.ordinal,
                    step: p.step,
                    time: p.time,
                    file: frame_file_name(p.ordinal),
                })
                .collect(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), SinkError> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, self).map_err(|e| SinkError::Serialisation(e.to_string()))?;
        out.flush()?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, SinkError> {
        let file = File::open(path)?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| SinkError::Serialisation(e.to_string()))
    }
}
