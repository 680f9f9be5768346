//! Lagrange basis evaluation on spectral-element reference nodes.
//!
//! For nodes $\xi_0, \dots, \xi_{n-1}$ and a point $\eta$,
//!
//! $$ \ell_k(\eta) = \prod_{j \ne k} \frac{\eta - \xi_j}{\xi_k - \xi_j} $$
//!
//! The weights form a partition of unity and reproduce any polynomial of
//! degree below $n$ exactly.

/// Evaluate all $n$ Lagrange basis polynomials of `nodes` at `eta`.
///
/// # Panics
/// Panics if `nodes` is empty.
pub fn lagrange_weights(eta: f64, nodes: &[f64]) -> Vec<f64> {
    let mut weights = vec![0.0; nodes.len()];
    lagrange_weights_into(eta, nodes, &mut weights);
    weights
}

/// Like [`lagrange_weights`], writing into `out` (same length as `nodes`).
pub fn lagrange_weights_into(eta: f64, nodes: &[f64], out: &mut [f64]) {
    assert!(!nodes.is_empty(), "Need at least one node");
    assert_eq!(nodes.len(), out.len(), "nodes and out must have equal length");

    for (k, &xk) in nodes.iter().enumerate() {
        let mut numerator = 1.0;
        let mut denominator = 1.0;
        for (j, &xj) in nodes.iter().enumerate() {
            if j != k {
                numerator *= eta - xj;
                denominator *= xk - xj;
            }
        }
        out[k] = numerator / denominator;
    }
}

/// Map `x` in `[lower, upper]` to the reference coordinate in $[-1, 1]$.
pub fn reference_coordinate(x: f64, lower: f64, upper: f64) -> f64 {
    (x - lower) / (upper - lower) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Five-point Gauss-Lobatto-Legendre nodes.
    fn gll5() -> Vec<f64> {
        let a = (3.0_f64 / 7.0).sqrt();
        vec![-1.0, -a, 0.0, a, 1.0]
    }

    #[test]
    fn test_kronecker_property_at_nodes() {
        let nodes = gll5();
        for (i, &xi) in nodes.iter().enumerate() {
            let w = lagrange_weights(xi, &nodes);
            for (k, &wk) in w.iter().enumerate() {
                let expected = if i == k { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(wk, expected, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_partition_of_unity() {
        let nodes = gll5();
        for i in 0..=40 {
            let eta = -1.0 + 2.0 * i as f64 / 40.0;
            let sum: f64 = lagrange_weights(eta, &nodes).iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_reproduces_quartic() {
        let nodes = gll5();
        let f = |x: f64| 3.0 * x.powi(4) - x.powi(3) + 0.5 * x - 2.0;
        let values: Vec<f64> = nodes.iter().map(|&x| f(x)).collect();
        for &eta in &[-0.93, -0.4, 0.05, 0.61, 0.99] {
            let w = lagrange_weights(eta, &nodes);
            let interp: f64 = w.iter().zip(&values).map(|(w, v)| w * v).sum();
            assert_abs_diff_eq!(interp, f(eta), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reference_coordinate_maps_endpoints() {
        assert_abs_diff_eq!(reference_coordinate(2.0, 2.0, 3.0), -1.0);
        assert_abs_diff_eq!(reference_coordinate(3.0, 2.0, 3.0), 1.0);
        assert_abs_diff_eq!(reference_coordinate(2.25, 2.0, 3.0), -0.5);
    }
}
