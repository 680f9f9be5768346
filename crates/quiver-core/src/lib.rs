//! # Quiver Core
//!
//! The numerical backbone of Quiver. This crate resamples a spectral-element
//! surface wavefield (per-element azimuthal Fourier coefficients on a
//! Gauss-Lobatto node layout) onto a uniform spherical point grid and
//! synthesises real three-component displacement frames from it.
//!
//! ## Pipeline
//!
//! 1. [`params::GlobalParameters::read`] pulls solver metadata from a
//!    [`source::SurfaceSource`].
//! 2. [`sampling::SurfaceSampling`] lays out distance bands and azimuth rings.
//! 3. [`locate::InterpolationTable`] assigns each distance to a mesh element
//!    and precomputes Lagrange weights.
//! 4. [`timesteps::TimeStepPlan`] turns a time window into solver steps.
//! 5. [`reconstruct::FrameReconstructor`] synthesises one frame per step.
//! 6. [`animation::render_animation`] fans frames out over a
//!    [`quiver_compute::ComputeBackend`] and hands them to a
//!    [`sink::FrameSink`].
//!
//! ## Modules
//!
//! - [`types`]: Configuration records and the [`types::Frame`] container.
//! - [`error`]: Pipeline error kinds.
//! - [`lagrange`]: Lagrange basis evaluation.

pub mod animation;
pub mod error;
pub mod lagrange;
pub mod locate;
pub mod params;
pub mod reconstruct;
pub mod sampling;
pub mod sink;
pub mod source;
pub mod timesteps;
pub mod types;

pub use error::QuiverError;
