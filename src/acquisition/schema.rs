//! Run-scoped channel layout.

use crate::error::{AppResult, DaqError};
use serde::{Deserialize, Serialize};

/// Largest channel count supported by the reference digitizer layout.
pub const DEFAULT_MAX_CHANNELS: usize = 8;

/// Channel count saved when nothing else is configured.
pub const DEFAULT_CHANNEL_COUNT: usize = 8;

/// Samples stored per channel and record.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 1024;

/// Largest per-channel capacity; Arrow fixed-size lists use an `i32` length.
pub const MAX_SAMPLE_CAPACITY: usize = i32::MAX as usize;

/// Immutable description of which channels are saved during a run and how many
/// samples each of them can hold.
///
/// A schema is built once at run start and never changes until the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSchema {
    channel_count: usize,
    sample_capacity: usize,
}

impl ChannelSchema {
    /// Build a schema for `nchan` channels of `sample_capacity` samples.
    ///
    /// # Errors
    ///
    /// Returns [`DaqError::Configuration`] when `nchan` is outside
    /// `[1, max_channels]`, when `sample_capacity` is zero or above
    /// [`MAX_SAMPLE_CAPACITY`], or when the buffers for all channels would not
    /// fit in one allocation. Values are never clamped.
    pub fn new(nchan: usize, max_channels: usize, sample_capacity: usize) -> AppResult<Self> {
        if nchan == 0 || nchan > max_channels {
            return Err(DaqError::Configuration(format!(
                "nchan must be in [1, {}], got {}",
                max_channels, nchan
            )));
        }
        if sample_capacity == 0 {
            return Err(DaqError::Configuration(
                "sample_capacity must be at least 1".to_string(),
            ));
        }
        if sample_capacity > MAX_SAMPLE_CAPACITY {
            return Err(DaqError::Configuration(format!(
                "sample_capacity must be at most {}, got {}",
                MAX_SAMPLE_CAPACITY, sample_capacity
            )));
        }
        let fits = nchan
            .checked_mul(sample_capacity)
            .and_then(|slots| slots.checked_mul(std::mem::size_of::<f64>()))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(DaqError::Configuration(format!(
                "{} channels of {} samples do not fit in memory",
                nchan, sample_capacity
            )));
        }

        Ok(Self {
            channel_count: nchan,
            sample_capacity,
        })
    }

    /// Schema with the reference limits (`N_max = 8`, 1024 samples).
    pub fn with_defaults(nchan: usize) -> AppResult<Self> {
        Self::new(nchan, DEFAULT_MAX_CHANNELS, DEFAULT_SAMPLE_CAPACITY)
    }

    /// Number of channels saved per record.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of sample slots per channel buffer.
    pub fn sample_capacity(&self) -> usize {
        self.sample_capacity
    }

    /// Whether a raw channel number maps to a saved channel.
    pub fn contains(&self, channel: i64) -> bool {
        usize::try_from(channel).is_ok_and(|c| c < self.channel_count)
    }
}
