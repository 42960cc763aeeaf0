//! CSV record writer.
//!
//! One row per record: `num_points` followed by every slot of every channel,
//! with headers of the form `<field>[<slot>]`.
use super::RecordWriter;
use crate::acquisition::record::{Record, RecordSchema};
use crate::error::{AppResult, DaqError};
use std::path::{Path, PathBuf};

#[cfg(feature = "storage_csv")]
use crate::acquisition::record::POINT_COUNT_FIELD;
#[cfg(feature = "storage_csv")]
use std::fs::File;

/// A writer for CSV files.
#[cfg(feature = "storage_csv")]
pub struct CsvRecordWriter {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    row: Vec<String>,
}

#[cfg(feature = "storage_csv")]
impl CsvRecordWriter {
    /// Writer that will create `path` when the schema is declared.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            row: Vec::new(),
        }
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(not(feature = "storage_csv"))]
pub struct CsvRecordWriter {
    path: PathBuf,
}

#[cfg(not(feature = "storage_csv"))]
impl CsvRecordWriter {
    /// Writer that will create `path` when the schema is declared.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordWriter for CsvRecordWriter {
    fn name(&self) -> &str {
        "csv"
    }

    fn declare_schema(&mut self, schema: &RecordSchema) -> AppResult<()> {
        #[cfg(not(feature = "storage_csv"))]
        {
            let _ = schema;
            return Err(DaqError::FeatureNotEnabled("storage_csv".to_string()));
        }

        #[cfg(feature = "storage_csv")]
        {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = File::create(&self.path).map_err(|e| {
                DaqError::Storage(format!(
                    "Failed to create CSV file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

            let mut header = Vec::with_capacity(1 + schema.channel_count * schema.sample_capacity);
            header.push(POINT_COUNT_FIELD.to_string());
            for field in schema.field_names() {
                header.extend((0..schema.sample_capacity).map(|i| format!("{field}[{i}]")));
            }

            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(&header)?;

            self.row = Vec::with_capacity(header.len());
            self.writer = Some(writer);
            tracing::info!("CSV writer initialized at '{}'.", self.path.display());
            Ok(())
        }
    }

    fn append(&mut self, record: &Record<'_>) -> AppResult<()> {
        #[cfg(not(feature = "storage_csv"))]
        {
            let _ = record;
            return Err(DaqError::FeatureNotEnabled("storage_csv".to_string()));
        }

        #[cfg(feature = "storage_csv")]
        {
            let writer = self
                .writer
                .as_mut()
                .ok_or_else(|| DaqError::Storage("CSV schema not declared".to_string()))?;

            self.row.clear();
            self.row.push(record.point_count.to_string());
            for buffer in record.buffers.channels() {
                self.row.extend(buffer.iter().map(f64::to_string));
            }
            writer.write_record(&self.row)?;
            Ok(())
        }
    }

    fn finish(&mut self) -> AppResult<()> {
        #[cfg(not(feature = "storage_csv"))]
        return Err(DaqError::FeatureNotEnabled("storage_csv".to_string()));

        #[cfg(feature = "storage_csv")]
        {
            if let Some(mut writer) = self.writer.take() {
                writer.flush()?;
            }
            tracing::info!("CSV writer shut down.");
            Ok(())
        }
    }
}

#[cfg(all(test, feature = "storage_csv"))]
mod tests {
    use super::*;
    use crate::acquisition::buffers::SampleBufferSet;
    use crate::acquisition::schema::ChannelSchema;
    use tempfile::TempDir;

    #[test]
    fn test_header_and_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("run.csv");

        let schema = ChannelSchema::new(2, 8, 2).unwrap();
        let mut buffers = SampleBufferSet::new(&schema);
        let mut writer = CsvRecordWriter::new(&path);

        writer
            .declare_schema(&RecordSchema::new(&schema, "wave"))
            .unwrap();
        buffers.write(0, 0, 1.5);
        buffers.write(1, 1, -2.0);
        writer
            .append(&Record {
                point_count: 1,
                buffers: &buffers,
            })
            .unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "num_points,wave0[0],wave0[1],wave1[0],wave1[1]");
        assert_eq!(lines[1], "1,1.5,0,0,-2");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_append_before_schema_fails() {
        let temp_dir = TempDir::new().unwrap();
        let schema = ChannelSchema::new(1, 8, 1).unwrap();
        let buffers = SampleBufferSet::new(&schema);
        let mut writer = CsvRecordWriter::new(temp_dir.path().join("x.csv"));

        assert!(writer
            .append(&Record {
                point_count: 0,
                buffers: &buffers,
            })
            .is_err());
    }
}
