//! Output record layout.

use super::buffers::SampleBufferSet;
use super::schema::ChannelSchema;
use serde::{Deserialize, Serialize};

/// Name of the scalar point-count field.
pub const POINT_COUNT_FIELD: &str = "num_points";

/// Default prefix for per-channel waveform fields (`dt5743_wave00`, `dt5743_wave01`, ...).
pub const DEFAULT_FIELD_PREFIX: &str = "dt5743_wave0";

/// Persisted layout of a run: one integer field plus one fixed-length `f64`
/// array field per channel.
///
/// Writers receive this once per run before the first record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Channels per record.
    pub channel_count: usize,
    /// Length of every channel array.
    pub sample_capacity: usize,
    /// Prefix used to derive channel field names.
    pub field_prefix: String,
}

impl RecordSchema {
    /// Layout for `schema` with the given field prefix.
    pub fn new(schema: &ChannelSchema, field_prefix: impl Into<String>) -> Self {
        Self {
            channel_count: schema.channel_count(),
            sample_capacity: schema.sample_capacity(),
            field_prefix: field_prefix.into(),
        }
    }

    /// Field name for a channel index.
    pub fn field_name(&self, channel: usize) -> String {
        format!("{}{}", self.field_prefix, channel)
    }

    /// All channel field names in channel order.
    pub fn field_names(&self) -> Vec<String> {
        (0..self.channel_count).map(|c| self.field_name(c)).collect()
    }
}

/// One completed record, borrowed from the run's buffers.
///
/// The record owns nothing; writers copy what they need before returning from
/// `append`, after which the buffers are reset for the next event.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Number of measurement batches accepted for the event.
    pub point_count: i32,
    /// Channel buffers, each exactly `sample_capacity` long.
    pub buffers: &'a SampleBufferSet,
}

impl<'a> Record<'a> {
    /// Samples stored for one channel.
    pub fn channel(&self, channel: usize) -> &'a [f64] {
        self.buffers.channel(channel)
    }

    /// Number of channel buffers in the record.
    pub fn channel_count(&self) -> usize {
        self.buffers.channel_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_follow_channel_index() {
        let schema = ChannelSchema::with_defaults(3).unwrap();
        let layout = RecordSchema::new(&schema, DEFAULT_FIELD_PREFIX);
        assert_eq!(
            layout.field_names(),
            vec!["dt5743_wave00", "dt5743_wave01", "dt5743_wave02"]
        );
        assert_eq!(layout.sample_capacity, 1024);
    }

    #[test]
    fn test_record_exposes_every_channel() {
        let schema = ChannelSchema::new(2, 8, 4).unwrap();
        let mut buffers = SampleBufferSet::new(&schema);
        buffers.write(1, 0, 3.0);

        let record = Record {
            point_count: 1,
            buffers: &buffers,
        };
        assert_eq!(record.channel_count(), 2);
        assert_eq!(record.channel(1), &[3.0, 0.0, 0.0, 0.0]);
    }
}
