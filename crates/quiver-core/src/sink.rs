//! Abstract frame emitter.
//!
//! A [`FrameSink`] is constructed with the fixed station coordinates and
//! then receives frames one at a time, possibly from several workers at
//! once. Point/vector correspondence is by position alone.

use std::sync::Mutex;

use thiserror::Error;

use crate::types::Frame;

/// Errors from frame sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame {ordinal} has {found} vectors but the point set has {expected}")]
    PointMismatch {
        ordinal: usize,
        expected: usize,
        found: usize,
    },

    #[error("Serialisation error: {0}")]
    Serialisation(String),
}

/// Accepts reconstructed frames.
pub trait FrameSink: Send + Sync {
    /// Persist one frame. Called at most once per ordinal, in any order.
    fn write_frame(&self, frame: &Frame) -> Result<(), SinkError>;
}

/// Keeps every frame in memory, for tests and in-process consumers.
#[derive(Debug, Default)]
pub struct CollectingSink {
    stations: Option<usize>,
    frames: Mutex<Vec<Frame>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects frames whose length differs from `stations`.
    pub fn with_stations(stations: usize) -> Self {
        Self {
            stations: Some(stations),
            frames: Mutex::default(),
        }
    }

    /// Collected frames sorted by ordinal.
    pub fn into_frames(self) -> Vec<Frame> {
        let mut frames = self
            .frames
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        frames.sort_by_key(|f| f.ordinal);
        frames
    }
}

impl FrameSink for CollectingSink {
    fn write_frame(&self, frame: &Frame) -> Result<(), SinkError> {
        if let Some(expected) = self.stations {
            if frame.displacement.len() != expected {
                return Err(SinkError::PointMismatch {
                    ordinal: frame.ordinal,
                    expected,
                    found: frame.displacement.len(),
                });
            }
        }
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ordinal: usize, n: usize) -> Frame {
        Frame {
            ordinal,
            step: ordinal * 2,
            time: ordinal as f64,
            displacement: vec![[0.0; 3]; n],
        }
    }

    #[test]
    fn test_collecting_sink_sorts_by_ordinal() {
        let sink = CollectingSink::new();
        sink.write_frame(&frame(2, 1)).unwrap();
        sink.write_frame(&frame(0, 1)).unwrap();
        sink.write_frame(&frame(1, 1)).unwrap();
        let ordinals: Vec<usize> = sink.into_frames().iter().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_station_count_enforced() {
        let sink = CollectingSink::with_stations(4);
        assert!(sink.write_frame(&frame(0, 4)).is_ok());
        assert!(matches!(
            sink.write_frame(&frame(1, 3)),
            Err(SinkError::PointMismatch { expected: 4, found: 3, .. })
        ));
    }
}
