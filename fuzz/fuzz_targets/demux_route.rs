//! Fuzz target for EventDemultiplexer routing.
//!
//! Tests:
//! - Arbitrary channel indices, including negative and out-of-range ones
//! - Sample runs shorter and longer than the buffer capacity
//! - Buffers of channels without a measurement keep the sentinel

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wave_daq::acquisition::{
    ChannelSchema, EventDemultiplexer, Measurement, SampleBufferSet, SENTINEL,
};

#[derive(Debug, Arbitrary)]
struct RouteInput {
    nchan: u8,
    capacity: u8,
    measurements: Vec<FuzzMeasurement>,
}

#[derive(Debug, Arbitrary)]
struct FuzzMeasurement {
    channel: i64,
    samples: Vec<f64>,
}

fuzz_target!(|input: RouteInput| {
    let nchan = usize::from(input.nchan % 8) + 1;
    let capacity = usize::from(input.capacity % 64) + 1;
    let schema = match ChannelSchema::new(nchan, 8, capacity) {
        Ok(s) => s,
        Err(_) => return,
    };

    let batch: Vec<Measurement> = input
        .measurements
        .into_iter()
        .take(64)
        .map(|m| Measurement::new(m.channel, m.samples))
        .collect();

    let mut buffers = SampleBufferSet::new(&schema);
    let outcome = EventDemultiplexer::new().route(&batch, &mut buffers, &schema);

    assert_eq!(outcome.routed + outcome.ignored, batch.len() as u64);

    let expected_truncated: u64 = batch
        .iter()
        .filter(|m| schema.contains(m.channel))
        .map(|m| m.sample_count().saturating_sub(capacity) as u64)
        .sum();
    assert_eq!(outcome.truncated_samples, expected_truncated);

    for c in 0..nchan {
        let touched = batch.iter().any(|m| m.channel == c as i64 && m.sample_count() > 0);
        let buffer = buffers.channel(c);
        assert_eq!(buffer.len(), capacity);
        if !touched {
            assert!(buffer.iter().all(|v| v.to_bits() == SENTINEL.to_bits()));
        }
    }

    buffers.reset();
    assert!(buffers.is_clear());
});
