//! Per-time-step synthesis of the displacement field.
//!
//! Each element stores, per time step, complex coefficients $c_{d,p,k}$ for
//! spatial dimension $d \in \{s, \phi, z\}$, edge node $p$ and azimuthal
//! order $k = 0, \dots, N-1$. At distance band $\Delta$ with Lagrange weights
//! $w_p$, the weighted Fourier row is
//!
//! $$ F_{d,k} = \sum_p w_p \, c_{d,p,k} $$
//!
//! and the real displacement at azimuth $\phi$ is
//!
//! $$ u_d(\phi) = \operatorname{Re}\Bigl( F_{d,0} + 2 \sum_{k \ge 1} F_{d,k} e^{ik\phi} \Bigr) $$
//!
//! which is finally rotated from the local $(s, \phi, z)$ frame into the
//! Cartesian frame of the sampled points.

use ndarray::{Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;

use crate::error::QuiverError;
use crate::locate::InterpolationTable;
use crate::sampling::SurfaceSampling;
use crate::source::{names, SourceError, SurfaceSource};

/// Number of spatial dimensions stored per coefficient block.
pub const DIMENSIONS: usize = 3;

/// Synthesises frames from a fixed sampling and interpolation table.
///
/// Holds only shared references, so one reconstructor can serve every
/// worker; each worker supplies its own [`SurfaceSource`] handle.
#[derive(Debug, Clone, Copy)]
pub struct FrameReconstructor<'a> {
    sampling: &'a SurfaceSampling,
    table: &'a InterpolationTable,
}

impl<'a> FrameReconstructor<'a> {
    pub fn new(sampling: &'a SurfaceSampling, table: &'a InterpolationTable) -> Result<Self, QuiverError> {
        if table.len() != sampling.distance_count() {
            return Err(QuiverError::invalid(format!(
                "interpolation table covers {} distances but sampling has {}",
                table.len(),
                sampling.distance_count()
            )));
        }
        Ok(Self { sampling, table })
    }

    /// Displacement at every station for solver step `step`, in station order.
    pub fn reconstruct(&self, source: &mut dyn SurfaceSource, step: usize) -> Result<Vec<[f64; 3]>, QuiverError> {
        let npe = self.table.nodes_per_edge();
        let mut displacement = Vec::with_capacity(self.sampling.station_count());
        let mut cached: Option<(usize, Vec<Complex64>)> = None;

        for (idist, (dist, ring)) in self.sampling.rings().enumerate() {
            let element = self.table.element(idist);
            // Neighbouring bands usually share an element.
            let coeffs = match cached.take() {
                Some((e, c)) if e == element => c,
                _ => source.element_fourier(element, step)?,
            };

            let wdotf = weighted_fourier(&coeffs, self.table.weights(idist), npe)
                .map_err(|e| with_element(e, element))?;
            cached = Some((element, coeffs));
            let (sin_d, cos_d) = dist.sin_cos();
            for &azim in ring {
                let [s, p, z] = synthesize(wdotf.view(), azim);
                displacement.push([s * cos_d - z * sin_d, p, s * sin_d + z * cos_d]);
            }
        }
        Ok(displacement)
    }
}

/// Contract an element's coefficients with node weights, giving the
/// `(3, N)` weighted Fourier matrix.
pub fn weighted_fourier(
    coeffs: &[Complex64],
    weights: ArrayView1<'_, f64>,
    nodes_per_edge: usize,
) -> Result<Array2<Complex64>, SourceError> {
    let block = nodes_per_edge * DIMENSIONS;
    if coeffs.is_empty() || block == 0 || coeffs.len() % block != 0 {
        return Err(SourceError::malformed(
            "edge coefficients",
            format!(
                "length {} is not a positive multiple of {} nodes x {} dimensions",
                coeffs.len(),
                nodes_per_edge,
                DIMENSIONS
            ),
        ));
    }
    if weights.len() != nodes_per_edge {
        return Err(SourceError::malformed(
            "edge coefficients",
            format!("{} weights for {} nodes", weights.len(), nodes_per_edge),
        ));
    }

    let orders = coeffs.len() / block;
    let fourier = ArrayView2::from_shape((DIMENSIONS * nodes_per_edge, orders), coeffs)
        .map_err(|e| SourceError::malformed("edge coefficients", e.to_string()))?;

    let mut wdotf = Array2::<Complex64>::zeros((DIMENSIONS, orders));
    for dim in 0..DIMENSIONS {
        let mut row = wdotf.row_mut(dim);
        for (node, &w) in weights.iter().enumerate() {
            row.scaled_add(Complex64::from(w), &fourier.row(dim * nodes_per_edge + node));
        }
    }
    Ok(wdotf)
}

/// Real-signal Fourier synthesis of a `(3, N)` weighted row at `azimuth`,
/// returning the local `(s, φ, z)` components.
///
/// Order 0 enters with weight 1, every other order with weight 2.
pub fn synthesize(wdotf: ArrayView2<'_, Complex64>, azimuth: f64) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (k, column) in wdotf.columns().into_iter().enumerate() {
        let factor = if k == 0 { 1.0 } else { 2.0 };
        let phase = Complex64::new(0.0, k as f64 * azimuth).exp() * factor;
        for (d, c) in column.iter().enumerate() {
            out[d] += (c * phase).re;
        }
    }
    out
}

fn with_element(err: SourceError, element: usize) -> SourceError {
    match err {
        SourceError::Malformed { message, .. } => SourceError::Malformed {
            name: names::edge_real(element),
            message,
        },
        other => other,
    }
}
