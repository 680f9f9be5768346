//! Legacy VTK point-cloud frames.
//!
//! Every frame becomes its own `UNSTRUCTURED_GRID` file: the station
//! coordinates as `POINTS`, one `VTK_VERTEX` cell per station and the
//! displacement as the point vector field `disp_RTZ`. Binary files use
//! big-endian `float`/`int` values as the legacy format requires.
//!
//! The geometry section is identical for every frame, so it is encoded
//! once at construction and copied into each file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use quiver_core::sink::{FrameSink, SinkError};
use quiver_core::types::Frame;

/// File title written on the second header line.
pub const TITLE: &str = "surface animation";
/// Name of the point vector field.
pub const FIELD_NAME: &str = "disp_RTZ";
const VTK_VERTEX: i32 = 1;

/// Data section encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VtkEncoding {
    Ascii,
    #[default]
    Binary,
}

impl VtkEncoding {
    fn keyword(self) -> &'static str {
        match self {
            VtkEncoding::Ascii => "ASCII",
            VtkEncoding::Binary => "BINARY",
        }
    }
}

/// Writes `surface_vtk_point.<ordinal>.vtk` files into one directory.
#[derive(Debug)]
pub struct VtkPointWriter {
    dir: PathBuf,
    stations: usize,
    encoding: VtkEncoding,
    geometry: Vec<u8>,
}

impl VtkPointWriter {
    /// Prepare a writer for `points`, creating `dir` if needed.
    pub fn new(dir: &Path, points: &[[f64; 3]], encoding: VtkEncoding) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)?;
        let geometry = encode_geometry(points, encoding)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stations: points.len(),
            encoding,
            geometry,
        })
    }

    /// Path of the file holding frame `ordinal`.
    pub fn frame_path(&self, ordinal: usize) -> PathBuf {
        self.dir.join(frame_file_name(ordinal))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn encoding(&self) -> VtkEncoding {
        self.encoding
    }
}

/// File name used for frame `ordinal`.
pub fn frame_file_name(ordinal: usize) -> String {
    format!("surface_vtk_point.{ordinal}.vtk")
}

impl FrameSink for VtkPointWriter {
    fn write_frame(&self, frame: &Frame) -> Result<(), SinkError> {
        if frame.displacement.len() != self.stations {
            return Err(SinkError::PointMismatch {
                ordinal: frame.ordinal,
                expected: self.stations,
                found: frame.displacement.len(),
            });
        }
        let path = self.frame_path(frame.ordinal);
        let mut out = BufWriter::new(File::create(&path)?);
        out.write_all(&self.geometry)?;
        write!(out, "POINT_DATA {}\nVECTORS {} float\n", self.stations, FIELD_NAME)?;
        write_vectors(&mut out, &frame.displacement, self.encoding)?;
        out.flush()?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Header, `POINTS`, `CELLS` and `CELL_TYPES` sections.
fn encode_geometry(points: &[[f64; 3]], encoding: VtkEncoding) -> std::io::Result<Vec<u8>> {
    let n = points.len();
    let mut buf = Vec::new();
    write!(
        buf,
        "# vtk DataFile Version 2.0\n{}\n{}\nDATASET UNSTRUCTURED_GRID\nPOINTS {} float\n",
        TITLE,
        encoding.keyword(),
        n
    )?;
    write_vectors(&mut buf, points, encoding)?;

    writeln!(buf, "CELLS {} {}", n, 2 * n)?;
    match encoding {
        VtkEncoding::Ascii => {
            for i in 0..n {
                writeln!(buf, "1 {i}")?;
            }
        }
        VtkEncoding::Binary => {
            for i in 0..n {
                buf.extend_from_slice(&1_i32.to_be_bytes());
                buf.extend_from_slice(&(i as i32).to_be_bytes());
            }
            buf.push(b'\n');
        }
    }

    writeln!(buf, "CELL_TYPES {}", n)?;
    match encoding {
        VtkEncoding::Ascii => {
            for _ in 0..n {
                writeln!(buf, "{VTK_VERTEX}")?;
            }
        }
        VtkEncoding::Binary => {
            for _ in 0..n {
                buf.extend_from_slice(&VTK_VERTEX.to_be_bytes());
            }
            buf.push(b'\n');
        }
    }
    Ok(buf)
}

fn write_vectors<W: Write>(out: &mut W, vectors: &[[f64; 3]], encoding: VtkEncoding) -> std::io::Result<()> {
    match encoding {
        VtkEncoding::Ascii => {
            for v in vectors {
                writeln!(out, "{} {} {}", v[0] as f32, v[1] as f32, v[2] as f32)?;
            }
        }
        VtkEncoding::Binary => {
            for v in vectors {
                for &c in v {
                    out.write_all(&(c as f32).to_be_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
