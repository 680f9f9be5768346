//! Global solver parameters read once at startup.

use serde::{Deserialize, Serialize};

use crate::source::{names, NodeLayout, SourceError, SurfaceSource};

/// Source location and ellipticity recorded by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceGeometry {
    /// Latitude (degrees).
    pub latitude: f64,
    /// Longitude (degrees).
    pub longitude: f64,
    /// Depth (metres).
    pub depth: f64,
    /// Flattening at the source radius.
    pub flattening: f64,
    /// Flattening of the outer surface.
    pub surface_flattening: f64,
}

/// The solver's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    /// Time of step 0 (seconds).
    pub initial_time: f64,
    /// Time between consecutive steps; zero for single-step databases.
    pub interval: f64,
    /// Number of stored steps (at least one).
    pub step_count: usize,
}

impl TimeAxis {
    /// Physical time of a solver step.
    pub fn time_of(&self, step: usize) -> f64 {
        self.initial_time + step as f64 * self.interval
    }
}

/// Immutable solver metadata shared by every stage and worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalParameters {
    /// Radius of the outer surface (metres).
    pub outer_radius: f64,
    pub source: SourceGeometry,
    pub time: TimeAxis,
    /// `[min, max]` polar angle (radians) per element, ordered by angle.
    pub element_bounds: Vec<[f64; 2]>,
    /// GLL reference nodes.
    pub interior_nodes: Vec<f64>,
    /// GLJ reference nodes.
    pub boundary_nodes: Vec<f64>,
}

impl GlobalParameters {
    /// Read and validate the global parameters from a data source.
    pub fn read(source: &dyn SurfaceSource) -> Result<Self, SourceError> {
        let outer_radius = source.attribute(names::RADIUS)?;
        if !(outer_radius.is_finite() && outer_radius > 0.0) {
            return Err(SourceError::malformed(
                names::RADIUS,
                format!("outer radius must be positive, got {outer_radius}"),
            ));
        }

        let geometry = SourceGeometry {
            latitude: source.attribute(names::SOURCE_LATITUDE)?,
            longitude: source.attribute(names::SOURCE_LONGITUDE)?,
            depth: source.attribute(names::SOURCE_DEPTH)?,
            flattening: source.attribute(names::SOURCE_FLATTENING)?,
            surface_flattening: source.attribute(names::SURFACE_FLATTENING)?,
        };

        let time = read_time_axis(&source.time_points()?)?;

        let element_bounds = source.element_bounds()?;
        validate_bounds(&element_bounds)?;

        let interior_nodes = source.node_layout(NodeLayout::Interior)?;
        let boundary_nodes = source.node_layout(NodeLayout::Boundary)?;
        if interior_nodes.len() < 2 {
            return Err(SourceError::malformed(
                names::GLL,
                format!("need at least 2 nodes per edge, got {}", interior_nodes.len()),
            ));
        }
        if boundary_nodes.len() != interior_nodes.len() {
            return Err(SourceError::malformed(
                names::GLJ,
                format!(
                    "length {} differs from {} length {}",
                    boundary_nodes.len(),
                    names::GLL,
                    interior_nodes.len()
                ),
            ));
        }
        check_distinct(names::GLL, &interior_nodes)?;
        check_distinct(names::GLJ, &boundary_nodes)?;

        Ok(Self {
            outer_radius,
            source: geometry,
            time,
            element_bounds,
            interior_nodes,
            boundary_nodes,
        })
    }

    /// Number of surface elements.
    pub fn element_count(&self) -> usize {
        self.element_bounds.len()
    }

    /// Number of nodes along an element edge.
    pub fn nodes_per_edge(&self) -> usize {
        self.interior_nodes.len()
    }

    /// Largest polar angle covered by the mesh.
    pub fn max_extent(&self) -> f64 {
        self.element_bounds.last().map_or(0.0, |b| b[1])
    }

    /// Node layout of an element: boundary nodes for the first and last
    /// element (pole-adjacent), interior nodes otherwise.
    pub fn layout_of(&self, element: usize) -> NodeLayout {
        if element == 0 || element + 1 == self.element_count() {
            NodeLayout::Boundary
        } else {
            NodeLayout::Interior
        }
    }

    /// Reference nodes of `layout`.
    pub fn nodes(&self, layout: NodeLayout) -> &[f64] {
        match layout {
            NodeLayout::Interior => &self.interior_nodes,
            NodeLayout::Boundary => &self.boundary_nodes,
        }
    }
}

fn read_time_axis(points: &[f64]) -> Result<TimeAxis, SourceError> {
    match points {
        [] => Err(SourceError::ZeroTimeSteps),
        [t0] => Ok(TimeAxis {
            initial_time: *t0,
            interval: 0.0,
            step_count: 1,
        }),
        [t0, t1, ..] => {
            let interval = t1 - t0;
            if !(interval.is_finite() && interval > 0.0) {
                return Err(SourceError::malformed(
                    names::TIME_POINTS,
                    format!("time points must increase, got t0={t0}, t1={t1}"),
                ));
            }
            Ok(TimeAxis {
                initial_time: *t0,
                interval,
                step_count: points.len(),
            })
        }
    }
}

// Lagrange weights divide by node differences.
fn check_distinct(name: &str, nodes: &[f64]) -> Result<(), SourceError> {
    if let Some(i) = nodes.iter().position(|x| !x.is_finite()) {
        return Err(SourceError::malformed(name, format!("node {i} is {}", nodes[i])));
    }
    for (i, a) in nodes.iter().enumerate() {
        if let Some(j) = nodes[i + 1..].iter().position(|b| b == a) {
            return Err(SourceError::malformed(
                name,
                format!("nodes {} and {} coincide at {}", i, i + 1 + j, a),
            ));
        }
    }
    Ok(())
}

fn validate_bounds(bounds: &[[f64; 2]]) -> Result<(), SourceError> {
    if bounds.is_empty() {
        return Err(SourceError::malformed(names::THETA, "no surface elements"));
    }
    for (i, b) in bounds.iter().enumerate() {
        if !(b[0] < b[1]) {
            return Err(SourceError::malformed(
                names::THETA,
                format!("element {i} has empty span [{}, {}]", b[0], b[1]),
            ));
        }
    }
    // Element search relies on non-decreasing upper bounds.
    if let Some(i) = bounds.windows(2).position(|w| w[1][1] < w[0][1]) {
        return Err(SourceError::malformed(
            names::THETA,
            format!("upper bounds decrease between elements {} and {}", i, i + 1),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySurface;

    fn surface() -> InMemorySurface {
        InMemorySurface {
            time_points: vec![10.0, 10.5, 11.0],
            element_bounds: vec![[0.0, 1.0], [1.0, 2.0], [2.0, std::f64::consts::PI]],
            interior_nodes: vec![-1.0, 0.0, 1.0],
            boundary_nodes: vec![-1.0, 0.2, 1.0],
            ..Default::default()
        }
        .with_attribute(names::RADIUS, 6_371_000.0)
        .with_attribute(names::SOURCE_LATITUDE, 12.0)
        .with_attribute(names::SOURCE_LONGITUDE, -45.0)
        .with_attribute(names::SOURCE_DEPTH, 10_000.0)
        .with_attribute(names::SOURCE_FLATTENING, 0.0)
        .with_attribute(names::SURFACE_FLATTENING, 0.0)
    }

    #[test]
    fn test_read_valid_parameters() {
        let params = GlobalParameters::read(&surface()).unwrap();
        assert_eq!(params.element_count(), 3);
        assert_eq!(params.nodes_per_edge(), 3);
        assert_eq!(params.time.step_count, 3);
        assert_eq!(params.time.interval, 0.5);
        assert_eq!(params.time.time_of(2), 11.0);
        assert_eq!(params.source.longitude, -45.0);
        assert_eq!(params.max_extent(), std::f64::consts::PI);
    }

    #[test]
    fn test_single_step_has_zero_interval() {
        let mut s = surface();
        s.time_points = vec![3.0];
        let params = GlobalParameters::read(&s).unwrap();
        assert_eq!(params.time.interval, 0.0);
        assert_eq!(params.time.step_count, 1);
    }

    #[test]
    fn test_zero_time_steps_rejected() {
        let mut s = surface();
        s.time_points.clear();
        assert!(matches!(GlobalParameters::read(&s), Err(SourceError::ZeroTimeSteps)));
    }

    #[test]
    fn test_mismatched_node_tables_rejected() {
        let mut s = surface();
        s.boundary_nodes.push(0.5);
        assert!(matches!(
            GlobalParameters::read(&s),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_repeated_nodes_rejected() {
        let mut s = surface();
        s.interior_nodes = vec![-1.0, 1.0, 1.0];
        match GlobalParameters::read(&s) {
            Err(SourceError::Malformed { name, .. }) => assert_eq!(name, names::GLL),
            other => panic!("expected malformed GLL, got {other:?}"),
        }

        let mut s = surface();
        s.boundary_nodes = vec![0.2, -1.0, 0.2];
        match GlobalParameters::read(&s) {
            Err(SourceError::Malformed { name, .. }) => assert_eq!(name, names::GLJ),
            other => panic!("expected malformed GLJ, got {other:?}"),
        }

        let mut s = surface();
        s.boundary_nodes = vec![-1.0, f64::NAN, 1.0];
        assert!(matches!(
            GlobalParameters::read(&s),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decreasing_bounds_rejected() {
        let mut s = surface();
        s.element_bounds = vec![[0.0, 2.0], [1.0, 1.5]];
        assert!(GlobalParameters::read(&s).is_err());
    }

    #[test]
    fn test_boundary_layout_for_polar_elements() {
        let params = GlobalParameters::read(&surface()).unwrap();
        assert_eq!(params.layout_of(0), NodeLayout::Boundary);
        assert_eq!(params.layout_of(1), NodeLayout::Interior);
        assert_eq!(params.layout_of(2), NodeLayout::Boundary);
        assert_eq!(params.nodes(NodeLayout::Boundary), &[-1.0, 0.2, 1.0]);
    }
}
