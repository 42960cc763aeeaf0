//! Per-channel sample storage for the record being built.

use super::schema::ChannelSchema;

/// Value every slot holds after [`SampleBufferSet::reset`].
pub const SENTINEL: f64 = 0.0;

/// One fixed-capacity buffer per saved channel, stored contiguously.
///
/// Channel `c` occupies `samples[c * capacity .. (c + 1) * capacity]`. The
/// allocation happens once in [`SampleBufferSet::new`]; `reset` and `write` only
/// mutate in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBufferSet {
    channel_count: usize,
    capacity: usize,
    samples: Vec<f64>,
}

impl SampleBufferSet {
    /// Allocate buffers sized to `schema`, filled with [`SENTINEL`].
    pub fn new(schema: &ChannelSchema) -> Self {
        let channel_count = schema.channel_count();
        let capacity = schema.sample_capacity();
        Self {
            channel_count,
            capacity,
            samples: vec![SENTINEL; channel_count * capacity],
        }
    }

    /// Clear every slot back to the sentinel.
    pub fn reset(&mut self) {
        self.samples.fill(SENTINEL);
    }

    /// Store one sample.
    ///
    /// Callers must pass `channel < channel_count()` and `index < capacity()`;
    /// the demultiplexer validates both before writing.
    #[inline]
    pub fn write(&mut self, channel: usize, index: usize, value: f64) {
        debug_assert!(channel < self.channel_count, "channel {channel} out of range");
        debug_assert!(index < self.capacity, "index {index} out of range");
        self.samples[channel * self.capacity + index] = value;
    }

    /// Copy a run of samples into the start of a channel buffer.
    ///
    /// Same contract as [`write`](Self::write): `values.len() <= capacity()`.
    #[inline]
    pub fn write_prefix(&mut self, channel: usize, values: &[f64]) {
        debug_assert!(values.len() <= self.capacity);
        let start = channel * self.capacity;
        self.samples[start..start + values.len()].copy_from_slice(values);
    }

    /// Samples of one channel, always exactly `capacity()` long.
    pub fn channel(&self, channel: usize) -> &[f64] {
        let start = channel * self.capacity;
        &self.samples[start..start + self.capacity]
    }

    /// Iterate channel buffers in channel order.
    pub fn channels(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.samples.chunks_exact(self.capacity)
    }

    /// Number of channel buffers.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Slots per channel buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether every slot still holds the sentinel.
    pub fn is_clear(&self) -> bool {
        self.samples.iter().all(|&v| v == SENTINEL)
    }
}
