//! Decoded per-channel digitizer measurements.

use serde::{Deserialize, Serialize};

/// One channel's raw samples within an event.
///
/// `channel` is the digitizer's own channel number and may lie outside the
/// channels saved for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Digitizer channel number.
    pub channel: i64,
    /// Samples in acquisition order.
    pub samples: Vec<f64>,
}

impl Measurement {
    /// Create a measurement from a channel number and its samples.
    pub fn new(channel: i64, samples: impl Into<Vec<f64>>) -> Self {
        Self {
            channel,
            samples: samples.into(),
        }
    }

    /// Number of samples the digitizer reported.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Measurements delivered together by one matching bank.
///
/// Each batch accounts for one point of the event's point counter.
pub type MeasurementBatch = Vec<Measurement>;
