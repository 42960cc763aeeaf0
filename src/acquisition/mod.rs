//! Event-to-record demultiplexing.
//!
//! - [`schema`]: which channels are saved and how many samples each holds
//! - [`buffers`]: the per-channel sample buffers of the record being built
//! - [`measurement`]: decoded per-channel samples delivered by an event
//! - [`demux`]: routing measurements into buffers
//! - [`record`]: the record view and persisted layout handed to writers
//! - [`run`]: the run lifecycle tying everything together

pub mod buffers;
pub mod demux;
pub mod measurement;
pub mod record;
pub mod run;
pub mod schema;

pub use buffers::{SampleBufferSet, SENTINEL};
pub use demux::{EventDemultiplexer, RouteOutcome};
pub use measurement::{Measurement, MeasurementBatch};
pub use record::{Record, RecordSchema};
pub use run::{EventOutcome, RunContext, RunCounters, RunState, RunSummary};
pub use schema::ChannelSchema;
