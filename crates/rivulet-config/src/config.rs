//! Runtime configuration file format.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rivulet_core::{
    BufferKind, DEFAULT_MAX_NOUTPUT_ITEMS, DEFAULT_STALL_TIMEOUT, ExecutorConfig, SchedulerConfig,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::find_config;

/// Which reference scheduler drives the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerMode {
    /// Round-robin on the calling thread.
    #[default]
    Single,
    /// One thread per block.
    Threaded,
}

/// Buffer allocation strategy as written in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferKindSetting {
    /// Double-mapped where available, single-mapped otherwise.
    #[default]
    Auto,
    /// Double-mapped only.
    DoubleMapped,
    /// Single-mapped with compaction.
    SingleMapped,
}

impl From<BufferKindSetting> for BufferKind {
    fn from(setting: BufferKindSetting) -> Self {
        match setting {
            BufferKindSetting::Auto => BufferKind::Auto,
            BufferKindSetting::DoubleMapped => BufferKind::DoubleMapped,
            BufferKindSetting::SingleMapped => BufferKind::SingleMapped,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    /// Cap on output items per work call.
    pub max_noutput_items: usize,
    /// Scheduler used by `rivulet run`.
    pub mode: SchedulerMode,
    /// Threaded deadlock detection window in milliseconds.
    pub stall_timeout_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_noutput_items: DEFAULT_MAX_NOUTPUT_ITEMS,
            mode: SchedulerMode::default(),
            stall_timeout_ms: DEFAULT_STALL_TIMEOUT.as_millis() as u64,
        }
    }
}

/// `[buffers]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuffersSection {
    /// Allocation strategy for every connection.
    pub kind: BufferKindSetting,
    /// Target bytes per connection before granularity rounding.
    pub default_bytes: usize,
}

impl Default for BuffersSection {
    fn default() -> Self {
        Self {
            kind: BufferKindSetting::default(),
            default_bytes: 32 * 1024,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `tracing-subscriber` filter directive; `RUST_LOG` overrides it.
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Complete runtime configuration.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # TOML Format
///
/// ```toml
/// [scheduler]
/// max_noutput_items = 100000
/// mode = "single"          # or "threaded"
/// stall_timeout_ms = 1000
///
/// [buffers]
/// kind = "auto"            # or "double_mapped", "single_mapped"
/// default_bytes = 32768
///
/// [logging]
/// filter = "info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Scheduler settings.
    pub scheduler: SchedulerSection,
    /// Buffer settings.
    pub buffers: BuffersSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

impl RuntimeConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file found by [`find_config`], or defaults if there is none.
    ///
    /// Returns the path that was read alongside the configuration.
    pub fn discover() -> Result<(Self, Option<PathBuf>), ConfigError> {
        match find_config() {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Save the configuration, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that parse but cannot drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_noutput_items == 0 {
            return Err(ConfigError::invalid(
                "scheduler.max_noutput_items",
                "must be at least 1",
            ));
        }
        if self.scheduler.stall_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "scheduler.stall_timeout_ms",
                "must be at least 1",
            ));
        }
        if self.buffers.default_bytes == 0 {
            return Err(ConfigError::invalid(
                "buffers.default_bytes",
                "must be at least 1",
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::invalid("logging.filter", "must not be empty"));
        }
        Ok(())
    }

    /// Executor settings for every block in a run.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_noutput_items: self.scheduler.max_noutput_items,
        }
    }

    /// Buffer kind for every connection in a run.
    pub fn buffer_kind(&self) -> BufferKind {
        self.buffers.kind.into()
    }

    /// Threaded scheduler settings.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            stall_timeout: Duration::from_millis(self.scheduler.stall_timeout_ms),
        }
    }
}
