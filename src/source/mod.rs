//! Event decoding.
//!
//! The run context never parses transport data itself. It asks an
//! [`EventDecoder`] for the measurement batches of a raw event and gets one of:
//!
//! - `Ok(Some(batches))`: the event carries data for this digitizer,
//! - `Ok(None)`: no matching bank, the event is skipped,
//! - `Err(DaqError::Decode(_))`: the event is malformed and skipped.
//!
//! [`BankDecoder`] selects banks by name from a [`RawEvent`];
//! [`jsonl::JsonEventDecoder`] adds JSON parsing on top for line-oriented event
//! dumps read by [`jsonl::EventLines`].

pub mod bank;
pub mod jsonl;

use crate::acquisition::measurement::MeasurementBatch;
use crate::error::AppResult;
use serde::{Deserialize, Serialize};

pub use bank::BankDecoder;
pub use jsonl::{EventLines, JsonEventDecoder};

/// Extracts measurement batches from raw events.
pub trait EventDecoder {
    /// Raw event type accepted by this decoder.
    type Event: ?Sized;

    /// Measurement batches for this digitizer, or `None` when the event has none.
    fn measurements(&self, event: &Self::Event) -> AppResult<Option<Vec<MeasurementBatch>>>;
}

/// One acquisition event as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event serial number, used in diagnostics only.
    #[serde(default)]
    pub serial: u64,
    /// Banks in transport order.
    #[serde(default)]
    pub banks: Vec<Bank>,
}

/// Named sub-block of an event supplied by one acquisition module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bank {
    /// Four-character bank identifier, e.g. `43FS`.
    pub name: String,
    /// Channel measurements carried by the bank.
    #[serde(default)]
    pub measurements: Vec<WireMeasurement>,
}

/// Measurement as encoded on the wire.
///
/// `sample_count` is the digitizer's declared length. When present it must not
/// exceed the number of samples actually carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMeasurement {
    /// Digitizer channel number.
    pub channel: i64,
    /// Declared number of valid samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<usize>,
    /// Sample values.
    #[serde(default)]
    pub samples: Vec<f64>,
}

impl<D: EventDecoder + ?Sized> EventDecoder for &D {
    type Event = D::Event;

    fn measurements(&self, event: &Self::Event) -> AppResult<Option<Vec<MeasurementBatch>>> {
        (**self).measurements(event)
    }
}
