//! Bank selection by name.

use super::{EventDecoder, RawEvent, WireMeasurement};
use crate::acquisition::measurement::{Measurement, MeasurementBatch};
use crate::error::{AppResult, DaqError};

/// Decodes the banks of one digitizer from a [`RawEvent`].
///
/// Every bank whose name matches yields one measurement batch.
#[derive(Debug, Clone)]
pub struct BankDecoder {
    bank: String,
}

impl BankDecoder {
    /// Decoder for banks named `bank`.
    pub fn new(bank: impl Into<String>) -> Self {
        Self { bank: bank.into() }
    }

    /// Bank name this decoder selects.
    pub fn bank(&self) -> &str {
        &self.bank
    }

    fn convert(&self, serial: u64, wire: &WireMeasurement) -> AppResult<Measurement> {
        let carried = wire.samples.len();
        let count = match wire.sample_count {
            Some(declared) if declared > carried => {
                return Err(DaqError::Decode(format!(
                    "event {}: bank {} channel {} declares {} samples but carries {}",
                    serial, self.bank, wire.channel, declared, carried
                )));
            }
            Some(declared) => declared,
            None => carried,
        };
        Ok(Measurement::new(wire.channel, &wire.samples[..count]))
    }
}

impl EventDecoder for BankDecoder {
    type Event = RawEvent;

    fn measurements(&self, event: &RawEvent) -> AppResult<Option<Vec<MeasurementBatch>>> {
        let mut batches = Vec::new();
        for bank in event.banks.iter().filter(|b| b.name == self.bank) {
            let batch = bank
                .measurements
                .iter()
                .map(|m| self.convert(event.serial, m))
                .collect::<AppResult<MeasurementBatch>>()?;
            batches.push(batch);
        }

        if batches.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batches))
        }
    }
}
