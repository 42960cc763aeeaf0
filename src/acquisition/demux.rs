//! Routing of decoded measurements into channel buffers.
//!
//! The routing rules mirror a fixed-size array layout:
//!
//! - a measurement for a channel outside the schema is ignored,
//! - samples past the buffer capacity are dropped,
//! - channels nobody reports keep the value left by the last reset.
//!
//! None of these cases is an error. They are tallied in [`RouteOutcome`] so the
//! run can expose them as diagnostics without logging above `trace`.

use super::buffers::SampleBufferSet;
use super::measurement::Measurement;
use super::schema::ChannelSchema;
use tracing::trace;

/// Tally of what happened to one batch of measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Measurements written into a channel buffer.
    pub routed: u64,
    /// Measurements dropped because their channel is not saved.
    pub ignored: u64,
    /// Samples dropped because they exceeded the buffer capacity.
    pub truncated_samples: u64,
}

impl RouteOutcome {
    /// Whether at least one measurement landed in a buffer.
    pub fn any_routed(&self) -> bool {
        self.routed > 0
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: RouteOutcome) {
        self.routed += other.routed;
        self.ignored += other.ignored;
        self.truncated_samples += other.truncated_samples;
    }
}

/// Stateless router from measurements to channel slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDemultiplexer;

impl EventDemultiplexer {
    /// Create a demultiplexer.
    pub fn new() -> Self {
        Self
    }

    /// Write each measurement's samples into the buffer of its channel.
    ///
    /// Buffers are not reset here; the caller resets once per event before the
    /// first batch.
    pub fn route(
        &self,
        measurements: &[Measurement],
        buffers: &mut SampleBufferSet,
        schema: &ChannelSchema,
    ) -> RouteOutcome {
        let mut outcome = RouteOutcome::default();
        let capacity = schema.sample_capacity();

        for m in measurements {
            if !schema.contains(m.channel) {
                trace!(channel = m.channel, "ignoring measurement for unsaved channel");
                outcome.ignored += 1;
                continue;
            }
            // `contains` guarantees a non-negative channel below channel_count.
            let channel = m.channel as usize;

            let kept = m.sample_count().min(capacity);
            buffers.write_prefix(channel, &m.samples[..kept]);

            let dropped = m.sample_count() - kept;
            if dropped > 0 {
                trace!(channel, dropped, "truncating samples beyond capacity");
                outcome.truncated_samples += dropped as u64;
            }
            outcome.routed += 1;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(nchan: usize, capacity: usize) -> (ChannelSchema, SampleBufferSet) {
        let schema = ChannelSchema::new(nchan, 8, capacity).unwrap();
        let buffers = SampleBufferSet::new(&schema);
        (schema, buffers)
    }

    #[test]
    fn test_routes_by_channel_and_ignores_unsaved() {
        let (schema, mut buffers) = setup(2, 4);
        let batch = vec![
            Measurement::new(0, vec![1.0, 2.0, 3.0]),
            Measurement::new(5, vec![9.0]),
        ];

        let outcome = EventDemultiplexer::new().route(&batch, &mut buffers, &schema);

        assert_eq!(buffers.channel(0), &[1.0, 2.0, 3.0, 0.0]);
        assert_eq!(buffers.channel(1), &[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(outcome.routed, 1);
        assert_eq!(outcome.ignored, 1);
        assert!(outcome.any_routed());
    }

    #[test]
    fn test_truncates_at_capacity() {
        let (schema, mut buffers) = setup(1, 4);
        let batch = vec![Measurement::new(0, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])];

        let outcome = EventDemultiplexer::new().route(&batch, &mut buffers, &schema);

        assert_eq!(buffers.channel(0), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffers.channel(0).len(), 4);
        assert_eq!(outcome.truncated_samples, 2);
    }

    #[test]
    fn test_negative_channel_ignored() {
        let (schema, mut buffers) = setup(2, 4);
        let batch = vec![Measurement::new(-1, vec![4.0])];

        let outcome = EventDemultiplexer::new().route(&batch, &mut buffers, &schema);

        assert!(!outcome.any_routed());
        assert!(buffers.is_clear());
    }

    #[test]
    fn test_later_measurement_overwrites_prefix_only() {
        let (schema, mut buffers) = setup(1, 4);
        let batch = vec![
            Measurement::new(0, vec![1.0, 1.0, 1.0, 1.0]),
            Measurement::new(0, vec![2.0, 2.0]),
        ];

        EventDemultiplexer::new().route(&batch, &mut buffers, &schema);

        assert_eq!(buffers.channel(0), &[2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_merge_outcomes() {
        let mut total = RouteOutcome {
            routed: 1,
            ignored: 2,
            truncated_samples: 3,
        };
        total.merge(RouteOutcome {
            routed: 4,
            ignored: 0,
            truncated_samples: 1,
        });
        assert_eq!(
            total,
            RouteOutcome {
                routed: 5,
                ignored: 2,
                truncated_samples: 4,
            }
        );
    }
}
