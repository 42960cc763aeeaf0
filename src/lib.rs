//! # Wave DAQ Core Library
//!
//! Converts a sequential stream of digitizer acquisition events into a columnar
//! record stream. Each event carries zero or more per-channel waveform
//! measurements; each output record stores one fixed-capacity sample buffer per
//! configured channel plus the event's point count.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: Channel schema, sample buffers, the event demultiplexer and
//!   the `RunContext` lifecycle that emits one record per accepted event.
//! - **`source`**: The `EventDecoder` seam plus bank selection and JSON-lines event
//!   dumps.
//! - **`storage`**: The `RecordWriter` trait with memory, CSV and Arrow IPC
//!   backends and a feature-aware writer registry.
//! - **`converter`**: The host loop running one run from a source to a writer.
//! - **`config`**: Layered configuration with Figment.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`error`**: The `DaqError` enum shared by every module.

pub mod acquisition;
pub mod config;
pub mod converter;
pub mod error;
pub mod logging;
pub mod source;
pub mod storage;

pub use acquisition::{ChannelSchema, Measurement, RunContext, RunCounters, RunSummary};
pub use converter::Converter;
pub use error::{AppResult, DaqError};
