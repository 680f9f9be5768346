//! # Quiver
//!
//! Facade over the Quiver workspace: turns a spectral-element surface
//! wavefield database into a sequence of point-cloud animation frames.
//!
//! - [`core`]: sampling, element location, time planning and frame
//!   reconstruction.
//! - [`io`]: concrete data sources and the VTK frame emitter.
//! - [`compute`]: worker-pool backends.

pub use quiver_compute as compute;
pub use quiver_core as core;
pub use quiver_io as io;
