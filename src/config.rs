//! Configuration using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (8 channels, 1024 samples, CSV output)
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `WAVE_DAQ_`, nested with `__`
//!
//! Command-line options are applied on top by the binary.
//!
//! # Example
//! ```no_run
//! use wave_daq::config::ConverterConfig;
//!
//! let config = ConverterConfig::load_from("wave_daq.toml")?;
//! config.validate()?;
//! println!("Saving {} channels", config.acquisition.nchan);
//! # Ok::<(), wave_daq::error::DaqError>(())
//! ```

use crate::acquisition::record::DEFAULT_FIELD_PREFIX;
use crate::acquisition::schema::{
    ChannelSchema, DEFAULT_CHANNEL_COUNT, DEFAULT_MAX_CHANNELS, DEFAULT_SAMPLE_CAPACITY,
};
use crate::error::{AppResult, DaqError};
use crate::storage::arrow_writer::DEFAULT_FLUSH_THRESHOLD;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "WAVE_DAQ_";

/// Top-level converter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Channel layout and point limits
    pub acquisition: AcquisitionConfig,
    /// Record writer settings
    pub storage: StorageConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "wave-daq".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Run-scoped acquisition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Number of digitizer channels to save, `1..=max_channels`
    pub nchan: usize,
    /// Upper bound on `nchan`
    pub max_channels: usize,
    /// Samples stored per channel and record
    pub sample_capacity: usize,
    /// Measurement batches accepted per event
    pub max_points: u32,
    /// Bank name carrying digitizer data
    pub bank: String,
    /// Prefix for per-channel field names
    pub field_prefix: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            nchan: DEFAULT_CHANNEL_COUNT,
            max_channels: DEFAULT_MAX_CHANNELS,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            max_points: 1,
            bank: "43FS".to_string(),
            field_prefix: DEFAULT_FIELD_PREFIX.to_string(),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Writer format (csv, arrow, or memory)
    pub backend: String,
    /// Directory for derived output paths; next to the input when unset
    pub output_dir: Option<PathBuf>,
    /// Records per batch for buffering writers
    pub flush_threshold: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "csv".to_string(),
            output_dir: None,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl ConverterConfig {
    /// Figment seeded with defaults and environment overrides.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ConverterConfig::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load defaults plus environment overrides.
    pub fn load() -> AppResult<Self> {
        Ok(Self::figment().extract()?)
    }

    /// Load defaults, then `path`, then environment overrides.
    ///
    /// A missing file is not an error; Figment treats it as empty.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Figment::from(Serialized::defaults(ConverterConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        self.acquisition.validate()?;

        let valid_backends = ["csv", "arrow", "memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid storage backend '{}'. Must be one of: {}",
                self.storage.backend,
                valid_backends.join(", ")
            )));
        }

        if self.storage.flush_threshold == 0 {
            return Err(DaqError::Configuration(
                "flush_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl AcquisitionConfig {
    /// Check the acquisition section on its own; used again at run start.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_channels == 0 {
            return Err(DaqError::Configuration(
                "max_channels must be at least 1".to_string(),
            ));
        }
        ChannelSchema::new(self.nchan, self.max_channels, self.sample_capacity)?;
        if self.max_points == 0 {
            return Err(DaqError::Configuration(
                "max_points must be at least 1".to_string(),
            ));
        }
        if self.bank.is_empty() {
            return Err(DaqError::Configuration(
                "bank name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConverterConfig::default();
        assert_eq!(config.acquisition.nchan, 8);
        assert_eq!(config.acquisition.sample_capacity, 1024);
        assert_eq!(config.acquisition.max_points, 1);
        assert_eq!(config.acquisition.bank, "43FS");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "wave.toml",
                r#"
                [acquisition]
                nchan = 4

                [storage]
                backend = "memory"
                "#,
            )?;
            jail.set_env("WAVE_DAQ_ACQUISITION__NCHAN", "2");

            let config = ConverterConfig::load_from("wave.toml").expect("load");
            assert_eq!(config.acquisition.nchan, 2);
            assert_eq!(config.acquisition.sample_capacity, 1024);
            assert_eq!(config.storage.backend, "memory");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConverterConfig::load_from("absent.toml").expect("load");
            assert_eq!(config, ConverterConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ConverterConfig::default();
        config.application.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nchan_out_of_range() {
        let mut config = ConverterConfig::default();
        config.acquisition.nchan = 9;
        assert!(config.validate().is_err());
        config.acquisition.nchan = 0;
        assert!(config.validate().is_err());

        config.acquisition.max_channels = 16;
        config.acquisition.nchan = 12;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = ConverterConfig::default();
        config.storage.backend = "root".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("root"));
    }

    #[test]
    fn test_huge_sample_capacity_rejected() {
        let mut config = ConverterConfig::default();
        config.acquisition.sample_capacity = usize::MAX / 4;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DaqError::Configuration(_)));
    }

    #[test]
    fn test_zero_max_points_rejected() {
        let mut config = ConverterConfig::default();
        config.acquisition.max_points = 0;
        assert!(config.validate().is_err());
    }
}
