use std::path::{Path, PathBuf};

use clap::ValueEnum;
use osmline::{BatchOptions, ErrorPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found at {config_path}")]
    ConfigNotFound { config_path: PathBuf },

    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field} in {config_path}: {message}")]
    InvalidValue {
        config_path: PathBuf,
        field: &'static str,
        message: String,
    },
}

/// What to do with a line that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Abort,
    Skip,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => ErrorPolicy::Abort,
            OnError::Skip => ErrorPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub on_error: OnError,
    pub rows_per_batch: usize,
    /// zstd level; frames are uncompressed when absent.
    pub compression_level: Option<i32>,
    /// Drop records that fail semantic validation.
    pub validate: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let batch = BatchOptions::default();
        Self {
            on_error: OnError::default(),
            rows_per_batch: batch.rows_per_batch,
            compression_level: batch.compression_level,
            validate: false,
        }
    }
}

impl IngestConfig {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Err(ConfigError::ConfigNotFound {
                config_path: config_path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: IngestConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if config.rows_per_batch == 0 {
            return Err(ConfigError::InvalidValue {
                config_path: config_path.to_path_buf(),
                field: "rows_per_batch",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(config)
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.on_error.into()
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            rows_per_batch: self.rows_per_batch,
            compression_level: self.compression_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("osmline.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
on_error = "skip"
rows_per_batch = 1000
compression_level = 9
validate = true
"#,
        );

        let config = IngestConfig::load_from_path(&path).unwrap();
        assert_eq!(
            config,
            IngestConfig {
                on_error: OnError::Skip,
                rows_per_batch: 1000,
                compression_level: Some(9),
                validate: true,
            }
        );
        assert_eq!(config.policy(), ErrorPolicy::Skip);
        assert_eq!(config.batch_options().compression_level, Some(9));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "validate = true\n");

        let config = IngestConfig::load_from_path(&path).unwrap();
        assert!(config.validate);
        assert_eq!(config.on_error, OnError::Abort);
        assert_eq!(config.compression_level, None);
        assert_eq!(config.rows_per_batch, BatchOptions::default().rows_per_batch);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        let err = IngestConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { config_path } if config_path == path));
    }

    #[test]
    fn test_parse_errors_carry_path() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "on_error = \"retry\"\n");
        let err = IngestConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("osmline.toml"));

        let path = write_config(&dir, "row_per_batch = 10\n");
        assert!(matches!(
            IngestConfig::load_from_path(&path),
            Err(ConfigError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_zero_rows_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "rows_per_batch = 0\n");
        assert!(matches!(
            IngestConfig::load_from_path(&path),
            Err(ConfigError::InvalidValue { field: "rows_per_batch", .. })
        ));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = IngestConfig {
            on_error: OnError::Skip,
            rows_per_batch: 7,
            compression_level: Some(3),
            validate: false,
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: IngestConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }
}
