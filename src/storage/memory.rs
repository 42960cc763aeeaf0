//! In-memory record writer.

use super::RecordWriter;
use crate::acquisition::record::{Record, RecordSchema};
use crate::error::{AppResult, DaqError};

/// Owned copy of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRecord {
    /// Point count stored with the record.
    pub point_count: i32,
    /// One buffer per channel.
    pub buffers: Vec<Vec<f64>>,
}

impl From<&Record<'_>> for OwnedRecord {
    fn from(record: &Record<'_>) -> Self {
        Self {
            point_count: record.point_count,
            buffers: record.buffers.channels().map(<[f64]>::to_vec).collect(),
        }
    }
}

/// Keeps every declared schema and appended record in memory.
///
/// Used for dry runs and as the observable writer in tests.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    schemas: Vec<RecordSchema>,
    records: Vec<OwnedRecord>,
    finished: usize,
}

impl MemoryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schemas in declaration order.
    pub fn schemas(&self) -> &[RecordSchema] {
        &self.schemas
    }

    /// Records in append order.
    pub fn records(&self) -> &[OwnedRecord] {
        &self.records
    }

    /// How many times `finish` was called.
    pub fn finish_count(&self) -> usize {
        self.finished
    }
}

impl RecordWriter for MemoryWriter {
    fn name(&self) -> &str {
        "memory"
    }

    fn declare_schema(&mut self, schema: &RecordSchema) -> AppResult<()> {
        self.schemas.push(schema.clone());
        Ok(())
    }

    fn append(&mut self, record: &Record<'_>) -> AppResult<()> {
        let Some(schema) = self.schemas.last() else {
            return Err(DaqError::Storage(
                "record appended before schema was declared".to_string(),
            ));
        };
        if record.channel_count() != schema.channel_count {
            return Err(DaqError::Storage(format!(
                "record has {} channels, schema declares {}",
                record.channel_count(),
                schema.channel_count
            )));
        }
        self.records.push(OwnedRecord::from(record));
        Ok(())
    }

    fn finish(&mut self) -> AppResult<()> {
        self.finished += 1;
        Ok(())
    }
}
