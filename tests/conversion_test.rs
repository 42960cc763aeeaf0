//! Full conversions from a JSON-lines dump to files on disk.

use std::io::Write;
use tempfile::TempDir;
use wave_daq::config::ConverterConfig;
use wave_daq::converter::Converter;
use wave_daq::source::{EventLines, JsonEventDecoder};
use wave_daq::storage::factory::{RecordWriterRegistry, WriterOptions};

const DUMP: &str = r#"{"serial":1,"banks":[{"name":"43FS","measurements":[{"channel":0,"samples":[1.0,2.0,3.0]},{"channel":5,"samples":[9.0]}]}]}
{"serial":2,"banks":[{"name":"TDC0","measurements":[]}]}

{"serial":3,"banks":[{"name":"43FS","measurements":[{"channel":1,"samples":[4.0,5.0,6.0,7.0,8.0]}]}]}
{"serial":4,"banks":[{"name":"43FS","measurements":[{"channel":0,"sample_count":9,"samples":[1.0]}]}]}
{"serial":5,"banks":
"#;

fn write_dump(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("run00042.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(DUMP.as_bytes()).unwrap();
    path
}

fn config(nchan: usize, capacity: usize, backend: &str) -> ConverterConfig {
    let mut config = ConverterConfig::default();
    config.acquisition.nchan = nchan;
    config.acquisition.sample_capacity = capacity;
    config.storage.backend = backend.to_string();
    config.validate().unwrap();
    config
}

#[test]
#[cfg(feature = "storage_csv")]
fn test_jsonl_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dump(&temp_dir);
    let output = temp_dir.path().join("run00042.csv");
    let config = config(2, 4, "csv");

    let registry = RecordWriterRegistry::new();
    let writer = registry
        .create("csv", &WriterOptions::new(&output))
        .unwrap();
    let decoder = JsonEventDecoder::new(config.acquisition.bank.clone());
    let mut converter = Converter::new(writer, config.acquisition.clone());

    let summary = converter
        .run(42, &decoder, EventLines::open(&input).unwrap())
        .unwrap();

    assert_eq!(summary.counters.good_banks, 2);
    assert_eq!(summary.counters.bad_banks, 3);
    assert_eq!(summary.counters.decode_failures, 2);
    assert_eq!(summary.counters.total_events(), 5);
    assert_eq!(summary.counters.ignored_measurements, 1);
    assert_eq!(summary.counters.truncated_samples, 1);

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 1 + 2 * 4);
    assert_eq!(&headers[0], "num_points");
    assert_eq!(&headers[1], "dt5743_wave00[0]");
    assert_eq!(&headers[5], "dt5743_wave01[0]");

    let rows: Vec<Vec<f64>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(|v| v.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec![1.0, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(rows[1], vec![1.0, 0.0, 0.0, 0.0, 0.0, 4.0, 5.0, 6.0, 7.0]);
}

#[test]
fn test_summary_serializes() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_dump(&temp_dir);
    let config = config(8, 16, "memory");

    let registry = RecordWriterRegistry::new();
    let writer = registry
        .create("memory", &WriterOptions::new("unused"))
        .unwrap();
    let decoder = JsonEventDecoder::new("43FS");
    let mut converter = Converter::new(writer, config.acquisition);

    let summary = converter
        .run(7, &decoder, EventLines::open(&input).unwrap())
        .unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["run_id"], 7);
    assert_eq!(json["channel_count"], 8);
    assert_eq!(json["counters"]["good_banks"], 2);
    assert_eq!(json["counters"]["bad_banks"], 3);
}

#[test]
fn test_missing_input_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.jsonl");
    assert!(EventLines::open(&missing).is_err());
}
