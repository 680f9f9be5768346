//! Abstract surface wavefield data source.
//!
//! A solver surface database exposes a handful of scalar attributes, a time
//! axis, a per-element polar-angle bounds table, two node-layout tables and,
//! for every element, a complex Fourier coefficient array per time step.
//! [`SurfaceSource`] is the read-only view of that container; a
//! [`SourceOpener`] hands out independent handles so that parallel workers
//! never share one.

use std::collections::BTreeMap;

use ndarray::Array2;
use num_complex::Complex64;
use thiserror::Error;

/// Names of attributes and variables in a surface database.
pub mod names {
    pub const RADIUS: &str = "radius";
    pub const SOURCE_LATITUDE: &str = "source_latitude";
    pub const SOURCE_LONGITUDE: &str = "source_longitude";
    pub const SOURCE_DEPTH: &str = "source_depth";
    pub const SOURCE_FLATTENING: &str = "source_flattening";
    pub const SURFACE_FLATTENING: &str = "surface_flattening";

    pub const TIME_POINTS: &str = "time_points";
    pub const THETA: &str = "theta";
    pub const GLL: &str = "GLL";
    pub const GLJ: &str = "GLJ";

    /// Variable holding the real part of an element's coefficients.
    pub fn edge_real(element: usize) -> String {
        format!("edge_{element}r")
    }

    /// Variable holding the imaginary part of an element's coefficients.
    pub fn edge_imag(element: usize) -> String {
        format!("edge_{element}i")
    }
}

/// Errors from surface data sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    #[error("Missing variable: {0}")]
    MissingVariable(String),

    #[error("Malformed variable '{name}': {message}")]
    Malformed { name: String, message: String },

    #[error("Time step {step} out of range (database has {steps} steps)")]
    StepOutOfRange { step: usize, steps: usize },

    #[error("Zero time steps in database")]
    ZeroTimeSteps,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl SourceError {
    pub fn malformed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Split a row-major `(elements, columns)` polar-angle table into
/// `[min, max]` pairs taken from the first two columns of each row.
pub fn bounds_from_table(values: &[f64], columns: usize) -> Result<Vec<[f64; 2]>, SourceError> {
    if columns < 2 {
        return Err(SourceError::malformed(
            names::THETA,
            format!("need at least 2 columns, got {columns}"),
        ));
    }
    if values.len() % columns != 0 {
        return Err(SourceError::malformed(
            names::THETA,
            format!("{} values do not fill rows of {} columns", values.len(), columns),
        ));
    }
    Ok(values.chunks_exact(columns).map(|row| [row[0], row[1]]).collect())
}

/// Which node layout to read from the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLayout {
    /// Gauss-Lobatto-Legendre nodes, used by interior elements.
    Interior,
    /// Gauss-Lobatto-Jacobi nodes, used by the two pole-adjacent elements.
    Boundary,
}

impl NodeLayout {
    /// Variable name of this layout in the database.
    pub fn variable(self) -> &'static str {
        match self {
            NodeLayout::Interior => names::GLL,
            NodeLayout::Boundary => names::GLJ,
        }
    }
}

/// Read access to a surface wavefield database.
///
/// Metadata accessors take `&self`; coefficient reads take `&mut self`
/// because file-backed handles seek.
pub trait SurfaceSource: Send {
    /// Scalar global attribute.
    fn attribute(&self, name: &str) -> Result<f64, SourceError>;

    /// Solver time of every stored step.
    fn time_points(&self) -> Result<Vec<f64>, SourceError>;

    /// `[min, max]` polar angle (radians) of every surface element.
    fn element_bounds(&self) -> Result<Vec<[f64; 2]>, SourceError>;

    /// Reference node coordinates in $[-1, 1]$ for the given layout.
    fn node_layout(&self, layout: NodeLayout) -> Result<Vec<f64>, SourceError>;

    /// Complex Fourier coefficients of `element` at time step `step`,
    /// flattened as (dimension, node, azimuthal order) in row-major order.
    fn element_fourier(&mut self, element: usize, step: usize) -> Result<Vec<Complex64>, SourceError>;
}

/// Hands out independent [`SurfaceSource`] handles, one per worker.
pub trait SourceOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn SurfaceSource>, SourceError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// A surface database held entirely in memory.
///
/// Used for synthetic inputs and tests; as a [`SourceOpener`] it gives each
/// worker a private copy.
#[derive(Debug, Clone, Default)]
pub struct InMemorySurface {
    pub attributes: BTreeMap<String, f64>,
    pub time_points: Vec<f64>,
    pub element_bounds: Vec<[f64; 2]>,
    pub interior_nodes: Vec<f64>,
    pub boundary_nodes: Vec<f64>,
    /// One `(steps, coefficients)` array per element.
    pub coefficients: Vec<Array2<Complex64>>,
}

impl InMemorySurface {
    /// Set a scalar attribute, returning `self` for chaining.
    pub fn with_attribute(mut self, name: &str, value: f64) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

impl SurfaceSource for InMemorySurface {
    fn attribute(&self, name: &str) -> Result<f64, SourceError> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| SourceError::MissingAttribute(name.to_string()))
    }

    fn time_points(&self) -> Result<Vec<f64>, SourceError> {
        Ok(self.time_points.clone())
    }

    fn element_bounds(&self) -> Result<Vec<[f64; 2]>, SourceError> {
        Ok(self.element_bounds.clone())
    }

    fn node_layout(&self, layout: NodeLayout) -> Result<Vec<f64>, SourceError> {
        let nodes = match layout {
            NodeLayout::Interior => &self.interior_nodes,
            NodeLayout::Boundary => &self.boundary_nodes,
        };
        Ok(nodes.clone())
    }

    fn element_fourier(&mut self, element: usize, step: usize) -> Result<Vec<Complex64>, SourceError> {
        let series = self
            .coefficients
            .get(element)
            .ok_or_else(|| SourceError::MissingVariable(names::edge_real(element)))?;
        if step >= series.nrows() {
            return Err(SourceError::StepOutOfRange {
                step,
                steps: series.nrows(),
            });
        }
        Ok(series.row(step).to_vec())
    }
}

impl SourceOpener for InMemorySurface {
    fn open(&self) -> Result<Box<dyn SurfaceSource>, SourceError> {
        Ok(Box::new(self.clone()))
    }

    fn describe(&self) -> String {
        format!(
            "in-memory surface ({} elements, {} steps)",
            self.element_bounds.len(),
            self.time_points.len()
        )
    }
}
