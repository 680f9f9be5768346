//! Element location and interpolation weights along the polar axis.
//!
//! Each sampled distance is assigned to the first element whose upper
//! polar-angle bound is at least that distance. On a shared boundary this
//! picks the lower element. The distance is then mapped to the element's
//! reference coordinate $\eta \in [-1, 1]$ and the Lagrange basis of the
//! element's node layout is evaluated there: boundary (GLJ) nodes for the two
//! pole-adjacent elements, interior (GLL) nodes elsewhere.

use ndarray::{Array2, ArrayView1};

use crate::error::QuiverError;
use crate::lagrange::{lagrange_weights_into, reference_coordinate};
use crate::params::GlobalParameters;

/// Element assignment and Lagrange weights for every distance band.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationTable {
    elements: Vec<usize>,
    etas: Vec<f64>,
    /// Shape `(distances, nodes_per_edge)`.
    weights: Array2<f64>,
}

impl InterpolationTable {
    /// Locate every distance and compute its weights.
    ///
    /// Distances must be non-decreasing (as produced by the sampler). A
    /// distance beyond the largest element bound is an
    /// [`OutOfRange`](QuiverError::OutOfRange) error.
    pub fn build(distances: &[f64], params: &GlobalParameters) -> Result<Self, QuiverError> {
        let max_bounds: Vec<f64> = params.element_bounds.iter().map(|b| b[1]).collect();
        let npe = params.nodes_per_edge();

        let mut elements = Vec::with_capacity(distances.len());
        let mut etas = Vec::with_capacity(distances.len());
        let mut weights = Array2::zeros((distances.len(), npe));

        for (idist, &dist) in distances.iter().enumerate() {
            let element = locate_element(&max_bounds, dist).ok_or(QuiverError::OutOfRange {
                distance: dist,
                max_extent: params.max_extent(),
            })?;
            let [lower, upper] = params.element_bounds[element];
            let eta = reference_coordinate(dist, lower, upper);
            let nodes = params.nodes(params.layout_of(element));

            let mut row = weights.row_mut(idist);
            let out = row
                .as_slice_mut()
                .ok_or_else(|| QuiverError::invalid("weight table row is not contiguous"))?;
            lagrange_weights_into(eta, nodes, out);

            elements.push(element);
            etas.push(eta);
        }

        Ok(Self {
            elements,
            etas,
            weights,
        })
    }

    /// Number of distance bands covered.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element assigned to distance band `idist`.
    pub fn element(&self, idist: usize) -> usize {
        self.elements[idist]
    }

    /// Element assignments of all distance bands.
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    /// Reference coordinate of distance band `idist` within its element.
    pub fn eta(&self, idist: usize) -> f64 {
        self.etas[idist]
    }

    /// Lagrange weights of distance band `idist`.
    pub fn weights(&self, idist: usize) -> ArrayView1<'_, f64> {
        self.weights.row(idist)
    }

    /// Number of weights per distance band.
    pub fn nodes_per_edge(&self) -> usize {
        self.weights.ncols()
    }
}

/// Index of the first element whose upper bound is `>= distance`, or `None`
/// if `distance` lies beyond every element.
pub fn locate_element(max_bounds: &[f64], distance: f64) -> Option<usize> {
    let idx = max_bounds.partition_point(|&upper| upper < distance);
    (idx < max_bounds.len()).then_some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{GlobalParameters, SourceGeometry, TimeAxis};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn params(nele: usize) -> GlobalParameters {
        let width = PI / nele as f64;
        let a = (3.0_f64 / 7.0).sqrt();
        GlobalParameters {
            outer_radius: 6_371_000.0,
            source: SourceGeometry {
                latitude: 0.0,
                longitude: 0.0,
                depth: 0.0,
                flattening: 0.0,
                surface_flattening: 0.0,
            },
            time: TimeAxis {
                initial_time: 0.0,
                interval: 1.0,
                step_count: 1,
            },
            element_bounds: (0..nele)
                .map(|e| {
                    let upper = if e + 1 == nele { PI } else { (e + 1) as f64 * width };
                    [e as f64 * width, upper]
                })
                .collect(),
            interior_nodes: vec![-1.0, -a, 0.0, a, 1.0],
            boundary_nodes: vec![-1.0, -0.6, 0.1, 0.65, 1.0],
        }
    }

    #[test]
    fn test_locate_tie_break_prefers_lower_element() {
        let max_bounds = [1.0, 2.0, 3.0];
        assert_eq!(locate_element(&max_bounds, 0.0), Some(0));
        assert_eq!(locate_element(&max_bounds, 1.0), Some(0));
        assert_eq!(locate_element(&max_bounds, 1.0 + 1e-12), Some(1));
        assert_eq!(locate_element(&max_bounds, 3.0), Some(2));
        assert_eq!(locate_element(&max_bounds, 3.5), None);
    }

    #[test]
    fn test_weights_partition_unity_and_monotonic_elements() {
        let p = params(7);
        let distances: Vec<f64> = (0..=60).map(|i| PI * i as f64 / 60.0).collect();
        let table = InterpolationTable::build(&distances, &p).unwrap();
        assert_eq!(table.len(), distances.len());
        assert_eq!(table.nodes_per_edge(), 5);
        for i in 0..table.len() {
            assert_abs_diff_eq!(table.weights(i).sum(), 1.0, epsilon = 1e-12);
            assert!((-1.0 - 1e-12..=1.0 + 1e-12).contains(&table.eta(i)));
        }
        assert!(table.elements().windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(table.element(0), 0);
        assert_eq!(*table.elements().last().unwrap(), 6);
    }

    #[test]
    fn test_boundary_layout_used_in_polar_elements() {
        let p = params(3);
        let width = PI / 3.0;
        // η = 0.1 is a boundary node and not an interior one.
        let d_first = 0.55 * width;
        let d_mid = width + 0.55 * width;
        let d_last = 2.0 * width + 0.55 * width;
        let table = InterpolationTable::build(&[d_first, d_mid, d_last], &p).unwrap();

        let w0 = table.weights(0);
        assert_abs_diff_eq!(w0[2], 1.0, epsilon = 1e-12);
        let w2 = table.weights(2);
        assert_abs_diff_eq!(w2[2], 1.0, epsilon = 1e-12);
        let w1 = table.weights(1);
        assert!((w1[2] - 1.0).abs() > 1e-3);
    }

    #[test]
    fn test_distance_beyond_mesh_is_out_of_range() {
        let mut p = params(4);
        p.element_bounds.pop();
        let err = InterpolationTable::build(&[0.1, PI], &p).unwrap_err();
        match err {
            QuiverError::OutOfRange { distance, max_extent } => {
                assert_eq!(distance, PI);
                assert_abs_diff_eq!(max_extent, 0.75 * PI, epsilon = 1e-12);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
