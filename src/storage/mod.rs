//! Record persistence.
//!
//! A [`RecordWriter`] receives the run layout once, then one record per accepted
//! event, then a single `finish` when the run ends. Calls are strictly sequential
//! and never overlap: a record is fully populated before `append` and the buffers
//! it borrows are only reset after `append` returns.
//!
//! Backends are selected by name through [`factory::RecordWriterRegistry`]:
//!
//! - `memory` → [`MemoryWriter`], always available
//! - `csv` → [`csv_writer::CsvRecordWriter`] (`storage_csv`)
//! - `arrow` → [`arrow_writer::ArrowRecordWriter`] (`storage_arrow`)

pub mod arrow_writer;
pub mod csv_writer;
pub mod factory;
pub mod memory;

use crate::acquisition::record::{Record, RecordSchema};
use crate::error::AppResult;

pub use factory::RecordWriterRegistry;
pub use memory::{MemoryWriter, OwnedRecord};

/// Sink for completed records.
pub trait RecordWriter {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Establish the persisted layout. Called once per run, before any record.
    fn declare_schema(&mut self, schema: &RecordSchema) -> AppResult<()>;

    /// Persist one record.
    fn append(&mut self, record: &Record<'_>) -> AppResult<()>;

    /// Flush buffered data and close the output. Called once at run end.
    fn finish(&mut self) -> AppResult<()>;
}

impl<W: RecordWriter + ?Sized> RecordWriter for Box<W> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn declare_schema(&mut self, schema: &RecordSchema) -> AppResult<()> {
        (**self).declare_schema(schema)
    }

    fn append(&mut self, record: &Record<'_>) -> AppResult<()> {
        (**self).append(record)
    }

    fn finish(&mut self) -> AppResult<()> {
        (**self).finish()
    }
}
