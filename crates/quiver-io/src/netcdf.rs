//! Solver surface databases stored as NetCDF.
//!
//! Attributes are global; `time_points`, `GLL` and `GLJ` are 1-D variables,
//! `theta` is `(elements, k >= 2)` with the bounds in its first two columns, and each `edge_<e>r`/`edge_<e>i` pair is
//! `(steps, coefficients)`. Single-precision databases are widened to `f64`
//! by the library on read.

use std::path::{Path, PathBuf};

use netcdf::AttributeValue;
use num_complex::Complex64;

use quiver_core::source::{bounds_from_table, names, NodeLayout, SourceError, SourceOpener, SurfaceSource};

fn backend(context: &str, err: netcdf::Error) -> SourceError {
    SourceError::Backend(format!("{context}: {err}"))
}

/// An open NetCDF surface database.
pub struct NetcdfSurface {
    path: PathBuf,
    file: netcdf::File,
    steps: usize,
}

impl NetcdfSurface {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = netcdf::open(path).map_err(|e| backend(&format!("cannot open '{}'", path.display()), e))?;
        let steps = file
            .variable(names::TIME_POINTS)
            .ok_or_else(|| SourceError::MissingVariable(names::TIME_POINTS.to_string()))?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            steps,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn values(&self, name: &str) -> Result<Vec<f64>, SourceError> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| SourceError::MissingVariable(name.to_string()))?;
        var.get_values::<f64, _>(..).map_err(|e| backend(name, e))
    }
}

impl SurfaceSource for NetcdfSurface {
    fn attribute(&self, name: &str) -> Result<f64, SourceError> {
        let attr = self
            .file
            .attribute(name)
            .ok_or_else(|| SourceError::MissingAttribute(name.to_string()))?;
        match attr.value().map_err(|e| backend(name, e))? {
            AttributeValue::Double(v) => Ok(v),
            AttributeValue::Float(v) => Ok(f64::from(v)),
            AttributeValue::Int(v) => Ok(f64::from(v)),
            AttributeValue::Short(v) => Ok(f64::from(v)),
            AttributeValue::Doubles(v) if v.len() == 1 => Ok(v[0]),
            AttributeValue::Floats(v) if v.len() == 1 => Ok(f64::from(v[0])),
            other => Err(SourceError::malformed(
                name,
                format!("expected a numeric scalar, found {other:?}"),
            )),
        }
    }

    fn time_points(&self) -> Result<Vec<f64>, SourceError> {
        self.values(names::TIME_POINTS)
    }

    fn element_bounds(&self) -> Result<Vec<[f64; 2]>, SourceError> {
        let var = self
            .file
            .variable(names::THETA)
            .ok_or_else(|| SourceError::MissingVariable(names::THETA.to_string()))?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let columns = match shape.as_slice() {
            [_, columns] => *columns,
            other => {
                return Err(SourceError::malformed(
                    names::THETA,
                    format!("expected a 2-D (elements, columns) table, got shape {other:?}"),
                ))
            }
        };
        let flat = var
            .get_values::<f64, _>(..)
            .map_err(|e| backend(names::THETA, e))?;
        bounds_from_table(&flat, columns)
    }

    fn node_layout(&self, layout: NodeLayout) -> Result<Vec<f64>, SourceError> {
        self.values(layout.variable())
    }

    fn element_fourier(&mut self, element: usize, step: usize) -> Result<Vec<Complex64>, SourceError> {
        if step >= self.steps {
            return Err(SourceError::StepOutOfRange {
                step,
                steps: self.steps,
            });
        }
        let read_row = |name: String| -> Result<Vec<f64>, SourceError> {
            let var = self
                .file
                .variable(&name)
                .ok_or_else(|| SourceError::MissingVariable(name.clone()))?;
            var.get_values::<f64, _>((step, ..)).map_err(|e| backend(&name, e))
        };
        let re = read_row(names::edge_real(element))?;
        let im = read_row(names::edge_imag(element))?;
        if re.len() != im.len() {
            return Err(SourceError::malformed(
                names::edge_imag(element),
                format!("{} imaginary parts for {} real parts", im.len(), re.len()),
            ));
        }
        Ok(re.into_iter().zip(im).map(|(re, im)| Complex64::new(re, im)).collect())
    }
}

/// Opens an independent NetCDF handle per worker.
#[derive(Debug, Clone)]
pub struct NetcdfOpener {
    path: PathBuf,
}

impl NetcdfOpener {
    pub fn new(path: &Path) -> Result<Self, SourceError> {
        if !path.is_file() {
            return Err(SourceError::Backend(format!("'{}' is not a file", path.display())));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl SourceOpener for NetcdfOpener {
    fn open(&self) -> Result<Box<dyn SurfaceSource>, SourceError> {
        Ok(Box::new(NetcdfSurface::open(&self.path)?))
    }

    fn describe(&self) -> String {
        format!("NetCDF database '{}'", self.path.display())
    }
}
