//! CLI Entry Point for wave-daq
//!
//! Converts a JSON-lines event dump into waveform records.
//!
//! # Usage
//!
//! ```bash
//! wave-daq convert run00042.jsonl --nchan 4
//! wave-daq convert run00042.jsonl --format arrow --output out/run00042.arrow
//! wave-daq formats
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use wave_daq::config::ConverterConfig;
use wave_daq::converter::Converter;
use wave_daq::logging::{self, OutputFormat, TracingConfig};
use wave_daq::source::{EventLines, JsonEventDecoder};
use wave_daq::storage::factory::{RecordWriterRegistry, WriterOptions};

#[derive(Parser)]
#[command(name = "wave-daq")]
#[command(about = "Digitizer event to waveform record converter", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true, default_value = "compact")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one event dump into a record file
    Convert {
        /// Path to the JSON-lines event dump
        input: PathBuf,

        /// Number of digitizer channels to save
        #[arg(long)]
        nchan: Option<usize>,

        /// Output path (derived from the input name when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Writer format (csv, arrow, memory)
        #[arg(long)]
        format: Option<String>,

        /// Run number recorded in the summary
        #[arg(long, default_value_t = 0)]
        run_id: i64,

        /// Write the run summary as JSON to this path
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// List the writer formats compiled into this binary
    Formats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConverterConfig::load_from(path),
        None => ConverterConfig::load(),
    }
    .context("loading configuration")?;
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }

    let format: OutputFormat = cli.log_format.parse()?;
    logging::init(TracingConfig::from_config(&config)?.with_format(format))?;

    match cli.command {
        Commands::Convert {
            input,
            nchan,
            output,
            format,
            run_id,
            summary_json,
        } => {
            if let Some(nchan) = nchan {
                info!("Number of channels to save: {}", nchan);
                config.acquisition.nchan = nchan;
            }
            if let Some(format) = format {
                config.storage.backend = format;
            }
            convert(&config, &input, output, run_id, summary_json)
        }
        Commands::Formats => {
            for format in RecordWriterRegistry::new().list_formats() {
                println!("{}", format);
            }
            Ok(())
        }
    }
}

fn convert(
    config: &ConverterConfig,
    input: &Path,
    output: Option<PathBuf>,
    run_id: i64,
    summary_json: Option<PathBuf>,
) -> Result<()> {
    config.validate()?;

    let registry = RecordWriterRegistry::new();
    let backend = config.storage.backend.as_str();
    let output = match output {
        Some(path) => path,
        None => derive_output_path(
            input,
            config.storage.output_dir.as_deref(),
            registry.extension(backend)?,
        ),
    };

    let options = WriterOptions {
        path: output.clone(),
        flush_threshold: config.storage.flush_threshold,
    };
    let writer = registry.create(backend, &options)?;

    info!("Converting '{}' -> '{}'", input.display(), output.display());
    let events = EventLines::open(input)?;
    let decoder = JsonEventDecoder::new(config.acquisition.bank.clone());

    let mut converter = Converter::new(writer, config.acquisition.clone());
    let summary = converter.run(run_id, &decoder, events)?;

    if let Some(path) = summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing summary to '{}'", path.display()))?;
    }

    println!(
        "Run {}: {} records, good banks {}, bad banks {}",
        summary.run_id,
        summary.counters.records_written,
        summary.counters.good_banks,
        summary.counters.bad_banks
    );
    Ok(())
}

/// `run00042.mid.jsonl` → `run00042.mid.<ext>`, optionally in another directory.
fn derive_output_path(input: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
    let mut path = input.with_extension(extension);
    if let Some(dir) = output_dir {
        if let Some(name) = path.file_name() {
            path = dir.join(name);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_next_to_input() {
        let path = derive_output_path(Path::new("data/run00042.mid.jsonl"), None, "csv");
        assert_eq!(path, PathBuf::from("data/run00042.mid.csv"));
    }

    #[test]
    fn test_derive_output_in_directory() {
        let path = derive_output_path(
            Path::new("data/run00042.jsonl"),
            Some(Path::new("/tmp/out")),
            "arrow",
        );
        assert_eq!(path, PathBuf::from("/tmp/out/run00042.arrow"));
    }
}
