//! Deterministic point sampling of the outer surface.
//!
//! Points are laid out in rings of constant epicentral distance $\Delta$.
//! With outer radius $R$ and target spacing $h$:
//!
//! $$ n_\Delta = \left\lfloor \frac{(\Delta_{\max} - \Delta_{\min}) R}{h} \right\rfloor + 1 $$
//!
//! distances are spaced linearly over $[\Delta_{\min}, \Delta_{\max}]$
//! (both ends included), and the ring at $\Delta$ holds
//! $\lfloor 2\pi R \sin\Delta / h \rfloor + 1$ azimuths spaced evenly over
//! $[0, 2\pi)$. Rings are never empty: a pole collapses to one point.
//!
//! Station order (ring by ring, azimuth within ring) is the contract with
//! frame consumers and never changes for identical inputs.

use std::f64::consts::PI;

use crate::error::QuiverError;
use crate::types::SamplingParams;

/// Upper bound on the number of sampled points.
pub const MAX_STATIONS: usize = 20_000_000;

/// One sampled station on the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub distance_index: usize,
    pub azimuth_index: usize,
    /// Unit-sphere position: $(\sin\Delta\cos\phi, \sin\Delta\sin\phi, \cos\Delta)$.
    pub position: [f64; 3],
}

/// Distance bands, azimuth rings and the flattened station coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSampling {
    distances: Vec<f64>,
    azimuths: Vec<Vec<f64>>,
    /// Index of the first station of each ring.
    offsets: Vec<usize>,
    points: Vec<[f64; 3]>,
}

impl SurfaceSampling {
    /// Sample the surface of a sphere of radius `outer_radius`.
    pub fn new(params: &SamplingParams, outer_radius: f64) -> Result<Self, QuiverError> {
        validate(params, outer_radius)?;

        let min_rad = params.min_dist_deg.to_radians();
        let max_rad = params.max_dist_deg.to_radians();
        let span = (params.max_dist_deg - params.min_dist_deg).to_radians();
        let ndist = point_count(span * outer_radius / params.spacing, "distance bands")?;
        let distances = linspace_inclusive(min_rad, max_rad, ndist);

        let ring_sizes = distances
            .iter()
            .map(|&dist| point_count(2.0 * PI * outer_radius * dist.sin() / params.spacing, "azimuths"))
            .collect::<Result<Vec<_>, _>>()?;
        let total = ring_sizes.iter().fold(0usize, |acc, &n| acc.saturating_add(n));
        if total > MAX_STATIONS {
            return Err(QuiverError::invalid(format!(
                "spatial sampling {} yields {} points, more than the limit of {}",
                params.spacing, total, MAX_STATIONS
            )));
        }

        let mut azimuths = Vec::with_capacity(ndist);
        let mut offsets = Vec::with_capacity(ndist);
        let mut points = Vec::with_capacity(total);
        for (idist, (&dist, &nazim)) in distances.iter().zip(&ring_sizes).enumerate() {
            let ring = linspace_exclusive(0.0, 2.0 * PI, nazim);

            offsets.push(points.len());
            let (sin_d, cos_d) = dist.sin_cos();
            points.extend(ring.iter().map(|azim| {
                let (sin_a, cos_a) = azim.sin_cos();
                [sin_d * cos_a, sin_d * sin_a, cos_d]
            }));
            log::trace!("ring {}: distance {:.6} rad, {} azimuths", idist, dist, nazim);
            azimuths.push(ring);
        }

        Ok(Self {
            distances,
            azimuths,
            offsets,
            points,
        })
    }

    /// Polar angles of the distance bands (radians, strictly increasing).
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Azimuths (radians) of the ring at distance band `idist`.
    pub fn ring(&self, idist: usize) -> &[f64] {
        &self.azimuths[idist]
    }

    /// Distance and azimuths of every ring, in station order.
    pub fn rings(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.distances
            .iter()
            .zip(self.azimuths.iter())
            .map(|(&d, ring)| (d, ring.as_slice()))
    }

    /// Number of distance bands.
    pub fn distance_count(&self) -> usize {
        self.distances.len()
    }

    /// Total number of stations.
    pub fn station_count(&self) -> usize {
        self.points.len()
    }

    /// Index of the first station of ring `idist`.
    pub fn ring_offset(&self, idist: usize) -> usize {
        self.offsets[idist]
    }

    /// Unit-sphere coordinates of all stations, in station order.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// All stations with their ring/azimuth indices, in station order.
    pub fn stations(&self) -> impl Iterator<Item = SamplePoint> + '_ {
        self.azimuths.iter().enumerate().flat_map(move |(idist, ring)| {
            let offset = self.offsets[idist];
            (0..ring.len()).map(move |iazim| SamplePoint {
                distance_index: idist,
                azimuth_index: iazim,
                position: self.points[offset + iazim],
            })
        })
    }
}

fn validate(params: &SamplingParams, outer_radius: f64) -> Result<(), QuiverError> {
    if !(params.spacing.is_finite() && params.spacing > 0.0) {
        return Err(QuiverError::invalid(format!(
            "spatial sampling must be positive, got {}",
            params.spacing
        )));
    }
    if !(outer_radius.is_finite() && outer_radius > 0.0) {
        return Err(QuiverError::invalid(format!(
            "outer radius must be positive, got {outer_radius}"
        )));
    }
    if !(params.min_dist_deg.is_finite() && params.max_dist_deg.is_finite()) {
        return Err(QuiverError::invalid("distance range must be finite"));
    }
    if params.min_dist_deg > params.max_dist_deg {
        return Err(QuiverError::invalid(format!(
            "min distance {} deg exceeds max distance {} deg",
            params.min_dist_deg, params.max_dist_deg
        )));
    }
    if params.min_dist_deg < 0.0 || params.max_dist_deg > 180.0 {
        return Err(QuiverError::invalid(format!(
            "distance range [{}, {}] deg must lie within [0, 180]",
            params.min_dist_deg, params.max_dist_deg
        )));
    }
    Ok(())
}

/// `floor(ratio) + 1`, checked in floating point before the cast.
fn point_count(ratio: f64, what: &str) -> Result<usize, QuiverError> {
    let count = ratio.max(0.0).floor() + 1.0;
    if !count.is_finite() || count > MAX_STATIONS as f64 {
        return Err(QuiverError::invalid(format!(
            "spatial sampling too fine: {count} {what} exceed the limit of {MAX_STATIONS} points"
        )));
    }
    Ok(count as usize)
}

/// `num` points over `[start, stop]`; the last point is exactly `stop`.
fn linspace_inclusive(start: f64, stop: f64, num: usize) -> Vec<f64> {
    if num == 1 {
        return vec![start];
    }
    let step = (stop - start) / (num - 1) as f64;
    let mut values: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
    values[num - 1] = stop;
    values
}

/// `num` points over `[start, stop)`.
fn linspace_exclusive(start: f64, stop: f64, num: usize) -> Vec<f64> {
    let step = (stop - start) / num as f64;
    (0..num).map(|i| start + i as f64 * step).collect()
}
