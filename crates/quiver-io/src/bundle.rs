//! Surface bundle: a directory-based surface database.
//!
//! Layout:
//! ```text
//! <bundle>/
//!   surface.json        header: attributes, time_points, theta, GLL, GLJ,
//!                       per-element coefficient counts
//!   edge_<e>r.bin       real parts,      f64 little-endian, (steps, ncoef_e)
//!   edge_<e>i.bin       imaginary parts, f64 little-endian, (steps, ncoef_e)
//! ```
//!
//! Opening a bundle reads only the header. Coefficient rows are read on
//! demand by seeking into the element files; every [`SurfaceBundle`] owns its
//! file handles, so concurrent workers each open their own bundle. A handle
//! keeps only the most recently read element's pair of files open, which
//! suits the reconstructor's non-decreasing element order.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use quiver_core::source::{names, InMemorySurface, NodeLayout, SourceError, SourceOpener, SurfaceSource};

/// Name of the header file inside a bundle.
pub const HEADER_FILE: &str = "surface.json";

const FORMAT_TAG: &str = "quiver-surface-bundle";
const FORMAT_VERSION: u32 = 1;
const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Contents of `surface.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleHeader {
    pub format: String,
    pub version: u32,
    pub attributes: BTreeMap<String, f64>,
    pub time_points: Vec<f64>,
    pub theta: Vec<[f64; 2]>,
    #[serde(rename = "GLL")]
    pub gll: Vec<f64>,
    #[serde(rename = "GLJ")]
    pub glj: Vec<f64>,
    /// Number of coefficients per time step, per element.
    pub edge_lengths: Vec<usize>,
}

impl BundleHeader {
    fn validate(&self) -> Result<(), SourceError> {
        if self.format != FORMAT_TAG {
            return Err(SourceError::malformed(
                HEADER_FILE,
                format!("unknown format tag '{}'", self.format),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(SourceError::malformed(
                HEADER_FILE,
                format!("unsupported version {}", self.version),
            ));
        }
        if self.edge_lengths.len() != self.theta.len() {
            return Err(SourceError::malformed(
                HEADER_FILE,
                format!(
                    "{} coefficient lengths for {} elements",
                    self.edge_lengths.len(),
                    self.theta.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Open handles on one element's coefficient files.
struct EdgeFiles {
    element: usize,
    real: File,
    imag: File,
    ncoef: usize,
}

/// A read handle on a surface bundle.
pub struct SurfaceBundle {
    root: PathBuf,
    header: BundleHeader,
    current: Option<EdgeFiles>,
    row_buffer: Vec<u8>,
}

impl SurfaceBundle {
    /// Open the bundle at `root`, reading its header.
    pub fn open(root: &Path) -> Result<Self, SourceError> {
        let header_path = root.join(HEADER_FILE);
        let file = File::open(&header_path).map_err(|e| {
            SourceError::Backend(format!("cannot open '{}': {}", header_path.display(), e))
        })?;
        let header: BundleHeader = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| SourceError::malformed(HEADER_FILE, e.to_string()))?;
        header.validate()?;

        Ok(Self {
            root: root.to_path_buf(),
            header,
            current: None,
            row_buffer: Vec::new(),
        })
    }

    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of elements whose coefficient files are currently open.
    pub fn open_elements(&self) -> usize {
        usize::from(self.current.is_some())
    }

    fn edge_files(&mut self, element: usize) -> Result<&mut EdgeFiles, SourceError> {
        let ncoef = *self
            .header
            .edge_lengths
            .get(element)
            .ok_or_else(|| SourceError::MissingVariable(names::edge_real(element)))?;
        let cached = matches!(&self.current, Some(edge) if edge.element == element);
        if !cached {
            // Close the previous pair before opening the next one.
            self.current = None;
            let expected = (self.header.time_points.len() * ncoef * F64_BYTES) as u64;
            let real = open_edge_file(&self.root, &names::edge_real(element), expected)?;
            let imag = open_edge_file(&self.root, &names::edge_imag(element), expected)?;
            log::trace!("opened coefficient files of element {}", element);
            self.current = Some(EdgeFiles {
                element,
                real,
                imag,
                ncoef,
            });
        }
        self.current
            .as_mut()
            .ok_or_else(|| SourceError::MissingVariable(names::edge_real(element)))
    }
}

fn open_edge_file(root: &Path, variable: &str, expected_len: u64) -> Result<File, SourceError> {
    let path = root.join(format!("{variable}.bin"));
    let file = File::open(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::MissingVariable(variable.to_string()),
        _ => SourceError::Io(e),
    })?;
    let actual = file.metadata()?.len();
    if actual != expected_len {
        return Err(SourceError::malformed(
            variable,
            format!("file holds {actual} bytes, header implies {expected_len}"),
        ));
    }
    Ok(file)
}

fn read_row(file: &mut File, step: usize, ncoef: usize, buffer: &mut Vec<u8>) -> Result<Vec<f64>, SourceError> {
    let row_bytes = ncoef * F64_BYTES;
    buffer.resize(row_bytes, 0);
    file.seek(SeekFrom::Start((step * row_bytes) as u64))?;
    file.read_exact(buffer)?;
    Ok(buffer
        .chunks_exact(F64_BYTES)
        .map(|chunk| {
            let mut bytes = [0u8; F64_BYTES];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect())
}

impl SurfaceSource for SurfaceBundle {
    fn attribute(&self, name: &str) -> Result<f64, SourceError> {
        self.header
            .attributes
            .get(name)
            .copied()
            .ok_or_else(|| SourceError::MissingAttribute(name.to_string()))
    }

    fn time_points(&self) -> Result<Vec<f64>, SourceError> {
        Ok(self.header.time_points.clone())
    }

    fn element_bounds(&self) -> Result<Vec<[f64; 2]>, SourceError> {
        Ok(self.header.theta.clone())
    }

    fn node_layout(&self, layout: NodeLayout) -> Result<Vec<f64>, SourceError> {
        Ok(match layout {
            NodeLayout::Interior => self.header.gll.clone(),
            NodeLayout::Boundary => self.header.glj.clone(),
        })
    }

    fn element_fourier(&mut self, element: usize, step: usize) -> Result<Vec<Complex64>, SourceError> {
        let steps = self.header.time_points.len();
        if step >= steps {
            return Err(SourceError::StepOutOfRange { step, steps });
        }
        let mut buffer = std::mem::take(&mut self.row_buffer);
        let edge = self.edge_files(element)?;
        let ncoef = edge.ncoef;
        let re = read_row(&mut edge.real, step, ncoef, &mut buffer)?;
        let im = read_row(&mut edge.imag, step, ncoef, &mut buffer)?;
        self.row_buffer = buffer;
        Ok(re
            .into_iter()
            .zip(im)
            .map(|(re, im)| Complex64::new(re, im))
            .collect())
    }
}

/// Opens a fresh [`SurfaceBundle`] per worker.
#[derive(Debug, Clone)]
pub struct BundleOpener {
    root: PathBuf,
}

impl BundleOpener {
    /// Check that `root` holds a readable bundle and remember its location.
    pub fn new(root: &Path) -> Result<Self, SourceError> {
        SurfaceBundle::open(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl SourceOpener for BundleOpener {
    fn open(&self) -> Result<Box<dyn SurfaceSource>, SourceError> {
        Ok(Box::new(SurfaceBundle::open(&self.root)?))
    }

    fn describe(&self) -> String {
        format!("surface bundle '{}'", self.root.display())
    }
}

/// Write `surface` as a bundle into `root` (created if missing).
pub fn write_bundle(root: &Path, surface: &InMemorySurface) -> Result<(), SourceError> {
    if surface.coefficients.len() != surface.element_bounds.len() {
        return Err(SourceError::malformed(
            names::THETA,
            format!(
                "{} coefficient arrays for {} elements",
                surface.coefficients.len(),
                surface.element_bounds.len()
            ),
        ));
    }
    let steps = surface.time_points.len();
    if let Some(e) = surface.coefficients.iter().position(|c| c.nrows() != steps) {
        return Err(SourceError::malformed(
            names::edge_real(e),
            format!("expected {} time steps, got {}", steps, surface.coefficients[e].nrows()),
        ));
    }

    std::fs::create_dir_all(root)?;
    let header = BundleHeader {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        attributes: surface.attributes.clone(),
        time_points: surface.time_points.clone(),
        theta: surface.element_bounds.clone(),
        gll: surface.interior_nodes.clone(),
        glj: surface.boundary_nodes.clone(),
        edge_lengths: surface.coefficients.iter().map(|c| c.ncols()).collect(),
    };
    let mut writer = BufWriter::new(File::create(root.join(HEADER_FILE))?);
    serde_json::to_writer_pretty(&mut writer, &header)
        .map_err(|e| SourceError::malformed(HEADER_FILE, e.to_string()))?;
    writer.flush()?;

    for (element, series) in surface.coefficients.iter().enumerate() {
        let mut real = BufWriter::new(File::create(root.join(format!("{}.bin", names::edge_real(element))))?);
        let mut imag = BufWriter::new(File::create(root.join(format!("{}.bin", names::edge_imag(element))))?);
        // Row-major iteration matches the (step, coefficient) file layout.
        for c in series.iter() {
            real.write_all(&c.re.to_le_bytes())?;
            imag.write_all(&c.im.to_le_bytes())?;
        }
        real.flush()?;
        imag.flush()?;
    }
    log::debug!(
        "wrote bundle '{}' ({} elements, {} steps)",
        root.display(),
        surface.coefficients.len(),
        steps
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::tempdir;

    fn surface() -> InMemorySurface {
        InMemorySurface {
            time_points: vec![0.0, 1.0, 2.0],
            element_bounds: vec![[0.0, 1.5], [1.5, std::f64::consts::PI]],
            interior_nodes: vec![-1.0, 0.0, 1.0],
            boundary_nodes: vec![-1.0, 0.25, 1.0],
            coefficients: vec![
                Array2::from_shape_fn((3, 9), |(t, i)| Complex64::new(t as f64, i as f64)),
                Array2::from_shape_fn((3, 18), |(t, i)| Complex64::new(-(i as f64), t as f64 * 0.5)),
            ],
            ..Default::default()
        }
        .with_attribute(names::RADIUS, 6_371_000.0)
    }

    #[test]
    fn test_reads_rows_written_by_writer() {
        let dir = tempdir().unwrap();
        let original = surface();
        write_bundle(dir.path(), &original).unwrap();

        let mut bundle = SurfaceBundle::open(dir.path()).unwrap();
        assert_eq!(bundle.attribute(names::RADIUS).unwrap(), 6_371_000.0);
        assert_eq!(bundle.element_bounds().unwrap(), original.element_bounds);
        assert_eq!(bundle.node_layout(NodeLayout::Boundary).unwrap(), vec![-1.0, 0.25, 1.0]);

        let row = bundle.element_fourier(1, 2).unwrap();
        assert_eq!(row, original.coefficients[1].row(2).to_vec());
        // Revisit an earlier element and step on the cached handles.
        let row = bundle.element_fourier(0, 0).unwrap();
        assert_eq!(row, original.coefficients[0].row(0).to_vec());
    }

    #[test]
    fn test_only_current_element_files_stay_open() {
        let dir = tempdir().unwrap();
        let nele = 300;
        let width = std::f64::consts::PI / nele as f64;
        let many = InMemorySurface {
            time_points: vec![0.0, 1.0],
            element_bounds: (0..nele).map(|e| [e as f64 * width, (e + 1) as f64 * width]).collect(),
            interior_nodes: vec![-1.0, 1.0],
            boundary_nodes: vec![-1.0, 1.0],
            coefficients: (0..nele)
                .map(|e| Array2::from_shape_fn((2, 6), |(t, i)| Complex64::new(e as f64, (t * 6 + i) as f64)))
                .collect(),
            ..Default::default()
        };
        write_bundle(dir.path(), &many).unwrap();

        let mut bundle = SurfaceBundle::open(dir.path()).unwrap();
        assert_eq!(bundle.open_elements(), 0);
        for e in (0..nele).chain([0, nele - 1, 7]) {
            let row = bundle.element_fourier(e, 1).unwrap();
            assert_eq!(row[0], Complex64::new(e as f64, 6.0));
            assert_eq!(bundle.open_elements(), 1);
        }
        // A failed open leaves nothing behind.
        assert!(bundle.element_fourier(nele, 0).is_err());
        assert!(bundle.open_elements() <= 1);
    }

    #[test]
    fn test_missing_edge_file_is_missing_variable() {
        let dir = tempdir().unwrap();
        write_bundle(dir.path(), &surface()).unwrap();
        std::fs::remove_file(dir.path().join("edge_1i.bin")).unwrap();

        let mut bundle = SurfaceBundle::open(dir.path()).unwrap();
        assert!(bundle.element_fourier(0, 1).is_ok());
        match bundle.element_fourier(1, 1) {
            Err(SourceError::MissingVariable(name)) => assert_eq!(name, "edge_1i"),
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_truncated_edge_file_is_malformed() {
        let dir = tempdir().unwrap();
        write_bundle(dir.path(), &surface()).unwrap();
        let path = dir.path().join("edge_0r.bin");
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();

        let mut bundle = SurfaceBundle::open(dir.path()).unwrap();
        assert!(matches!(
            bundle.element_fourier(0, 0),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_step_out_of_range() {
        let dir = tempdir().unwrap();
        write_bundle(dir.path(), &surface()).unwrap();
        let mut bundle = SurfaceBundle::open(dir.path()).unwrap();
        assert!(matches!(
            bundle.element_fourier(0, 3),
            Err(SourceError::StepOutOfRange { step: 3, steps: 3 })
        ));
    }

    #[test]
    fn test_opener_requires_header() {
        let dir = tempdir().unwrap();
        assert!(BundleOpener::new(dir.path()).is_err());
        write_bundle(dir.path(), &surface()).unwrap();
        let opener = BundleOpener::new(dir.path()).unwrap();
        let handle = opener.open().unwrap();
        assert_eq!(handle.time_points().unwrap().len(), 3);
    }

    #[test]
    fn test_writer_rejects_step_mismatch() {
        let dir = tempdir().unwrap();
        let mut s = surface();
        s.coefficients[1] = Array2::zeros((2, 18));
        assert!(write_bundle(dir.path(), &s).is_err());
    }
}
