//! Error types for configuration operations.

use std::path::PathBuf;
use thiserror::Error;

/// Why a `rivulet.toml` could not be loaded, saved or accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `save` could not write the file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `save` could not create the parent directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML, or an unknown key or enum value.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The in-memory config did not serialize.
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending field, e.g. `buffers.default_bytes`.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Wraps a read failure on `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Wraps a write failure on `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Wraps a directory-creation failure on `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Rejects `field` (a dotted path such as `buffers.default_bytes`).
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuntimeConfig;
    use std::error::Error;

    fn rejected(mutate: impl FnOnce(&mut RuntimeConfig)) -> ConfigError {
        let mut config = RuntimeConfig::default();
        mutate(&mut config);
        config.validate().unwrap_err()
    }

    #[test]
    fn each_bad_field_names_its_dotted_path() {
        let cases: [(ConfigError, &str); 4] = [
            (
                rejected(|c| c.scheduler.max_noutput_items = 0),
                "invalid value for 'scheduler.max_noutput_items': must be at least 1",
            ),
            (
                rejected(|c| c.scheduler.stall_timeout_ms = 0),
                "invalid value for 'scheduler.stall_timeout_ms': must be at least 1",
            ),
            (
                rejected(|c| c.buffers.default_bytes = 0),
                "invalid value for 'buffers.default_bytes': must be at least 1",
            ),
            (
                rejected(|c| c.logging.filter = "\t".into()),
                "invalid value for 'logging.filter': must not be empty",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
            assert!(err.source().is_none());
        }
    }

    #[test]
    fn first_bad_field_wins() {
        let err = rejected(|c| {
            c.buffers.default_bytes = 0;
            c.scheduler.max_noutput_items = 0;
        });
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scheduler.max_noutput_items",
                ..
            }
        ));
    }

    #[test]
    fn missing_file_keeps_path_and_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RuntimeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { path: ref p, .. } if *p == path));
        assert!(err.to_string().contains("absent.toml"), "got: {err}");
        assert!(err.source().is_some());
    }

    #[test]
    fn type_mismatch_is_a_parse_error() {
        let err = RuntimeConfig::from_toml_str("[buffers]\ndefault_bytes = \"big\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
        assert!(err.to_string().starts_with("failed to parse TOML"), "got: {err}");
    }
}
