//! Fuzz target for JSON-lines event decoding.
//!
//! Tests:
//! - Arbitrary byte lines never panic the decoder
//! - A decoded event always yields non-empty batches

#![no_main]

use libfuzzer_sys::fuzz_target;
use wave_daq::source::{EventDecoder, JsonEventDecoder};

fuzz_target!(|data: &[u8]| {
    let line = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(_) => return,
    };

    let decoder = JsonEventDecoder::new("43FS");
    if let Ok(Some(batches)) = decoder.measurements(line) {
        assert!(!batches.is_empty());
    }
});
