//! # Quiver IO
//!
//! Concrete data sources and frame emitters for the Quiver pipeline.
//!
//! - **Sources** implement [`quiver_core::source::SurfaceSource`]:
//!   - [`bundle`]: a directory with a JSON header and raw little-endian
//!     coefficient files (always available).
//!   - `netcdf`: the solver's native NetCDF database (feature `netcdf`).
//! - **Sinks** implement [`quiver_core::sink::FrameSink`]:
//!   - [`vtk`]: legacy VTK point clouds, one file per frame.
//! - [`manifest`]: JSON index of the rendered frames.

pub mod bundle;
pub mod manifest;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod vtk;

use std::path::Path;

use quiver_core::source::{SourceError, SourceOpener};

/// Pick a source opener for `path` based on what it points at.
///
/// A directory holding a bundle header opens as a [`bundle::BundleOpener`];
/// a `.nc` file opens through NetCDF when that feature is enabled.
pub fn opener_for(path: &Path) -> Result<Box<dyn SourceOpener>, SourceError> {
    if path.is_dir() {
        return Ok(Box::new(bundle::BundleOpener::new(path)?));
    }
    match path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "netcdf")]
        Some("nc") => Ok(Box::new(netcdf::NetcdfOpener::new(path)?)),
        #[cfg(not(feature = "netcdf"))]
        Some("nc") => Err(SourceError::Backend(format!(
            "'{}' is a NetCDF database but this build lacks the `netcdf` feature",
            path.display()
        ))),
        _ => Err(SourceError::Backend(format!(
            "Unrecognised surface database '{}': expected a bundle directory or a .nc file",
            path.display()
        ))),
    }
}
