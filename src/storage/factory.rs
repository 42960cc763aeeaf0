//! Record writer factory with automatic feature-based registration.
use super::arrow_writer::DEFAULT_FLUSH_THRESHOLD;
use super::{MemoryWriter, RecordWriter};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::PathBuf;

#[cfg(feature = "storage_arrow")]
use super::arrow_writer::ArrowRecordWriter;
#[cfg(feature = "storage_csv")]
use super::csv_writer::CsvRecordWriter;

/// Parameters handed to a writer factory.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Output file path.
    pub path: PathBuf,
    /// Records per batch for buffering backends.
    pub flush_threshold: usize,
}

impl WriterOptions {
    /// Options for `path` with the default flush threshold.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

type WriterFactory = Box<dyn Fn(&WriterOptions) -> Box<dyn RecordWriter> + Send + Sync>;

struct Registration {
    extension: String,
    factory: WriterFactory,
}

/// Registry for record writer factories with automatic feature detection.
///
/// # Examples
///
/// ```
/// use wave_daq::storage::factory::{RecordWriterRegistry, WriterOptions};
///
/// let registry = RecordWriterRegistry::new();
/// for format in registry.list_formats() {
///     println!("Available format: {}", format);
/// }
///
/// let writer = registry.create("memory", &WriterOptions::new("unused"))?;
/// assert_eq!(writer.name(), "memory");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct RecordWriterRegistry {
    factories: HashMap<String, Registration>,
}

impl Default for RecordWriterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordWriterRegistry {
    /// Creates a new registry and registers every writer compiled in.
    ///
    /// - `memory` → always
    /// - `csv` → `storage_csv`
    /// - `arrow` → `storage_arrow`
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("memory", "mem", |_| Box::new(MemoryWriter::new()));

        #[cfg(feature = "storage_csv")]
        registry.register("csv", "csv", |opts| {
            Box::new(CsvRecordWriter::new(&opts.path))
        });

        #[cfg(feature = "storage_arrow")]
        registry.register("arrow", "arrow", |opts| {
            Box::new(ArrowRecordWriter::new(&opts.path).with_flush_threshold(opts.flush_threshold))
        });

        registry
    }

    /// Registers a writer factory under `format`, replacing any previous one.
    ///
    /// `extension` is the file extension used when deriving output paths.
    pub fn register<F>(&mut self, format: &str, extension: &str, factory: F)
    where
        F: Fn(&WriterOptions) -> Box<dyn RecordWriter> + Send + Sync + 'static,
    {
        self.factories.insert(
            format.to_string(),
            Registration {
                extension: extension.to_string(),
                factory: Box::new(factory),
            },
        );
    }

    /// Creates a writer for `format`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the format is unknown or its feature is not enabled.
    pub fn create(&self, format: &str, options: &WriterOptions) -> Result<Box<dyn RecordWriter>> {
        self.factories
            .get(format)
            .map(|reg| (reg.factory)(options))
            .ok_or_else(|| self.unsupported(format))
    }

    /// File extension registered for `format`.
    pub fn extension(&self, format: &str) -> Result<&str> {
        self.factories
            .get(format)
            .map(|reg| reg.extension.as_str())
            .ok_or_else(|| self.unsupported(format))
    }

    /// Sorted list of registered format names.
    pub fn list_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.factories.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Whether `format` can be created.
    pub fn is_available(&self, format: &str) -> bool {
        self.factories.contains_key(format)
    }

    fn unsupported(&self, format: &str) -> anyhow::Error {
        anyhow!(
            "Unsupported storage format: '{}'. Available formats: [{}]",
            format,
            self.list_formats().join(", ")
        )
    }
}
