//! Conversion of a requested time window into solver time-step indices.
//!
//! With step spacing $\delta t$ and first stored time $t_0$, the plan starts
//! at $\max(\mathrm{round}((t_s - t_0)/\delta t), 0)$ and advances by
//! $\max(\mathrm{round}(\Delta t/\delta t), 1)$ steps, stopping after the
//! requested number of snapshots or at the last stored step. Rounding is
//! half-to-even. A single-step database always yields the plan `[0]`.

use serde::{Deserialize, Serialize};

use crate::error::QuiverError;
use crate::params::TimeAxis;
use crate::types::TimeWindow;

/// One entry of a [`TimeStepPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Position in the plan (frame number).
    pub ordinal: usize,
    /// Solver time-step index.
    pub step: usize,
    /// Physical time of the step.
    pub time: f64,
}

/// Strictly increasing solver steps to render, clamped to the stored range.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStepPlan {
    steps: Vec<usize>,
    axis: TimeAxis,
}

impl TimeStepPlan {
    /// Plan the snapshots of `window` on the solver time axis.
    pub fn new(window: &TimeWindow, axis: &TimeAxis) -> Result<Self, QuiverError> {
        if window.snapshots == 0 {
            return Err(QuiverError::invalid("number of snapshots must be positive"));
        }
        if !(window.interval.is_finite() && window.interval > 0.0) {
            return Err(QuiverError::invalid(format!(
                "time interval must be positive, got {}",
                window.interval
            )));
        }
        if !window.start_time.is_finite() {
            return Err(QuiverError::invalid("start time must be finite"));
        }
        if axis.step_count == 0 {
            return Err(QuiverError::invalid("time axis has no steps"));
        }

        if axis.step_count == 1 {
            return Ok(Self {
                steps: vec![0],
                axis: TimeAxis {
                    interval: 0.0,
                    ..*axis
                },
            });
        }

        let dt = axis.interval;
        let start = ((window.start_time - axis.initial_time) / dt)
            .round_ties_even()
            .max(0.0);
        let stride = (window.interval / dt).round_ties_even().max(1.0);

        let last = (axis.step_count - 1) as f64;
        let steps: Vec<usize> = (0..window.snapshots)
            .map(|k| start + k as f64 * stride)
            .take_while(|&s| s <= last)
            .map(|s| s as usize)
            .collect();

        if steps.is_empty() {
            log::warn!(
                "Start time {} s lies beyond the last stored step (t = {} s); nothing to render",
                window.start_time,
                axis.time_of(axis.step_count - 1)
            );
        } else if steps.len() < window.snapshots {
            log::warn!(
                "Requested {} snapshots but only {} fit before the last stored step",
                window.snapshots,
                steps.len()
            );
        }

        Ok(Self { steps, axis: *axis })
    }

    /// Solver steps in plan order.
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time axis the plan was built on.
    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    /// Entry `ordinal` of the plan.
    pub fn get(&self, ordinal: usize) -> Option<PlannedStep> {
        self.steps.get(ordinal).map(|&step| PlannedStep {
            ordinal,
            step,
            time: self.axis.time_of(step),
        })
    }

    /// All entries in plan order.
    pub fn iter(&self) -> impl Iterator<Item = PlannedStep> + '_ {
        (0..self.steps.len()).filter_map(move |k| self.get(k))
    }

    /// Entries handled by `worker` out of `workers` under round-robin
    /// assignment (`ordinal % workers == worker`).
    pub fn partition(&self, worker: usize, workers: usize) -> impl Iterator<Item = PlannedStep> + '_ {
        let workers = workers.max(1);
        self.iter().filter(move |p| p.ordinal % workers == worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(t0: f64, dt: f64, n: usize) -> TimeAxis {
        TimeAxis {
            initial_time: t0,
            interval: dt,
            step_count: n,
        }
    }

    fn window(start: f64, interval: f64, snapshots: usize) -> TimeWindow {
        TimeWindow {
            start_time: start,
            interval,
            snapshots,
        }
    }

    #[test]
    fn test_single_step_plan_is_zero() {
        let plan = TimeStepPlan::new(&window(500.0, 10.0, 20), &axis(0.0, 0.0, 1)).unwrap();
        assert_eq!(plan.steps(), &[0]);
        assert_eq!(plan.get(0).unwrap().time, 0.0);
    }

    #[test]
    fn test_regular_plan() {
        let plan = TimeStepPlan::new(&window(10.0, 5.0, 4), &axis(0.0, 0.5, 1000)).unwrap();
        assert_eq!(plan.steps(), &[20, 30, 40, 50]);
        assert_eq!(plan.get(2).unwrap().time, 20.0);
    }

    #[test]
    fn test_start_before_first_step_clamps_to_zero() {
        let plan = TimeStepPlan::new(&window(-100.0, 1.0, 3), &axis(-10.0, 1.0, 50)).unwrap();
        assert_eq!(plan.steps(), &[0, 1, 2]);
    }

    #[test]
    fn test_sub_step_interval_collapses_to_consecutive_steps() {
        let plan = TimeStepPlan::new(&window(0.0, 0.1, 4), &axis(0.0, 1.0, 50)).unwrap();
        assert_eq!(plan.steps(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_plan_truncated_at_last_step() {
        let plan = TimeStepPlan::new(&window(0.0, 3.0, 10), &axis(0.0, 1.0, 10)).unwrap();
        assert_eq!(plan.steps(), &[0, 3, 6, 9]);
        assert!(plan.steps().iter().all(|&s| s < 10));
        assert!(plan.steps().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_start_beyond_end_gives_empty_plan() {
        let plan = TimeStepPlan::new(&window(100.0, 1.0, 3), &axis(0.0, 1.0, 10)).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_half_steps_round_to_even() {
        // (2.5 - 0) / 1 rounds to 2, interval 1.5 rounds to 2.
        let plan = TimeStepPlan::new(&window(2.5, 1.5, 3), &axis(0.0, 1.0, 100)).unwrap();
        assert_eq!(plan.steps(), &[2, 4, 6]);
    }

    #[test]
    fn test_invalid_windows() {
        let a = axis(0.0, 1.0, 10);
        assert!(matches!(
            TimeStepPlan::new(&window(0.0, 1.0, 0), &a),
            Err(QuiverError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeStepPlan::new(&window(0.0, 0.0, 3), &a),
            Err(QuiverError::InvalidInput(_))
        ));
        assert!(matches!(
            TimeStepPlan::new(&window(f64::NAN, 1.0, 3), &a),
            Err(QuiverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_round_robin_partition_covers_plan_once() {
        let plan = TimeStepPlan::new(&window(0.0, 1.0, 7), &axis(0.0, 1.0, 100)).unwrap();
        let mut seen: Vec<usize> = (0..3)
            .flat_map(|w| plan.partition(w, 3).map(|p| p.ordinal).collect::<Vec<_>>())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
        let first: Vec<usize> = plan.partition(1, 3).map(|p| p.ordinal).collect();
        assert_eq!(first, vec![1, 4]);
    }
}
