//! Arrow IPC record writer.
//!
//! Writes the columnar record layout as an Arrow IPC file:
//!
//! | Column | Type |
//! |--------|------|
//! | `num_points` | `Int32` |
//! | `<prefix><c>` for each channel `c` | `FixedSizeList<Float64>[sample_capacity]` |
//!
//! Records are buffered column-wise and written as one `RecordBatch` every
//! `flush_threshold` records, plus a final partial batch on `finish`.
//!
//! # Feature Flags
//!
//! - `storage_arrow`: Enables the writer. Without it every call returns
//!   [`DaqError::FeatureNotEnabled`].

use super::RecordWriter;
use crate::acquisition::record::{Record, RecordSchema};
use crate::error::{AppResult, DaqError};
use std::path::{Path, PathBuf};

#[cfg(feature = "storage_arrow")]
use crate::acquisition::record::POINT_COUNT_FIELD;
#[cfg(feature = "storage_arrow")]
use arrow::array::{ArrayRef, FixedSizeListArray, Float64Array, Int32Array};
#[cfg(feature = "storage_arrow")]
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
#[cfg(feature = "storage_arrow")]
use arrow::ipc::writer::FileWriter;
#[cfg(feature = "storage_arrow")]
use arrow::record_batch::RecordBatch;
#[cfg(feature = "storage_arrow")]
use std::fs::File;
#[cfg(feature = "storage_arrow")]
use std::sync::Arc;

/// Default number of records per written batch.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 256;

/// State for an open output file.
#[cfg(feature = "storage_arrow")]
struct ActiveArrowFile {
    writer: FileWriter<File>,
    schema: SchemaRef,
    item_field: FieldRef,
    sample_capacity: usize,
    point_counts: Vec<i32>,
    /// One flat column per channel, `rows * sample_capacity` long.
    columns: Vec<Vec<f64>>,
}

#[cfg(feature = "storage_arrow")]
impl ActiveArrowFile {
    fn buffered_rows(&self) -> usize {
        self.point_counts.len()
    }

    fn flush(&mut self) -> AppResult<()> {
        if self.point_counts.is_empty() {
            return Ok(());
        }

        let size = i32::try_from(self.sample_capacity)
            .map_err(|_| DaqError::Storage("sample capacity exceeds i32".to_string()))?;

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(1 + self.columns.len());
        arrays.push(Arc::new(Int32Array::from(std::mem::take(
            &mut self.point_counts,
        ))));
        for column in &mut self.columns {
            let values = Float64Array::from(std::mem::take(column));
            let list =
                FixedSizeListArray::try_new(self.item_field.clone(), size, Arc::new(values), None)?;
            arrays.push(Arc::new(list));
        }

        let batch = RecordBatch::try_new(self.schema.clone(), arrays)?;
        self.writer.write(&batch)?;
        Ok(())
    }
}

/// Arrow IPC file writer for waveform records.
///
/// # Example
///
/// ```ignore
/// use wave_daq::storage::arrow_writer::ArrowRecordWriter;
///
/// let writer = ArrowRecordWriter::new("run00042.arrow").with_flush_threshold(1000);
/// ```
pub struct ArrowRecordWriter {
    path: PathBuf,
    flush_threshold: usize,
    #[cfg(feature = "storage_arrow")]
    active: Option<ActiveArrowFile>,
}

impl ArrowRecordWriter {
    /// Writer that will create `path` when the schema is declared.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            #[cfg(feature = "storage_arrow")]
            active: None,
        }
    }

    /// Set the flush threshold (records per batch, minimum 1).
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordWriter for ArrowRecordWriter {
    fn name(&self) -> &str {
        "arrow"
    }

    #[cfg(feature = "storage_arrow")]
    fn declare_schema(&mut self, schema: &RecordSchema) -> AppResult<()> {
        let size = i32::try_from(schema.sample_capacity)
            .map_err(|_| DaqError::Storage("sample capacity exceeds i32".to_string()))?;
        let item_field: FieldRef = Arc::new(Field::new("item", DataType::Float64, false));

        let mut fields = vec![Field::new(POINT_COUNT_FIELD, DataType::Int32, false)];
        for name in schema.field_names() {
            fields.push(Field::new(
                name,
                DataType::FixedSizeList(item_field.clone(), size),
                false,
            ));
        }
        let arrow_schema = Arc::new(Schema::new(fields));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        let writer = FileWriter::try_new(file, &arrow_schema)?;

        self.active = Some(ActiveArrowFile {
            writer,
            schema: arrow_schema,
            item_field,
            sample_capacity: schema.sample_capacity,
            point_counts: Vec::with_capacity(self.flush_threshold),
            columns: vec![
                Vec::with_capacity(self.flush_threshold * schema.sample_capacity);
                schema.channel_count
            ],
        });
        tracing::info!("Arrow writer initialized at '{}'.", self.path.display());
        Ok(())
    }

    #[cfg(feature = "storage_arrow")]
    fn append(&mut self, record: &Record<'_>) -> AppResult<()> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| DaqError::Storage("Arrow schema not declared".to_string()))?;
        if record.channel_count() != active.columns.len() {
            return Err(DaqError::Storage(format!(
                "record has {} channels, schema declares {}",
                record.channel_count(),
                active.columns.len()
            )));
        }

        active.point_counts.push(record.point_count);
        for (column, buffer) in active.columns.iter_mut().zip(record.buffers.channels()) {
            column.extend_from_slice(buffer);
        }

        if active.buffered_rows() >= self.flush_threshold {
            active.flush()?;
        }
        Ok(())
    }

    #[cfg(feature = "storage_arrow")]
    fn finish(&mut self) -> AppResult<()> {
        if let Some(mut active) = self.active.take() {
            active.flush()?;
            active.writer.finish()?;
        }
        tracing::info!("Arrow writer shut down.");
        Ok(())
    }

    #[cfg(not(feature = "storage_arrow"))]
    fn declare_schema(&mut self, _schema: &RecordSchema) -> AppResult<()> {
        Err(DaqError::FeatureNotEnabled("storage_arrow".to_string()))
    }

    #[cfg(not(feature = "storage_arrow"))]
    fn append(&mut self, _record: &Record<'_>) -> AppResult<()> {
        Err(DaqError::FeatureNotEnabled("storage_arrow".to_string()))
    }

    #[cfg(not(feature = "storage_arrow"))]
    fn finish(&mut self) -> AppResult<()> {
        Err(DaqError::FeatureNotEnabled("storage_arrow".to_string()))
    }
}
