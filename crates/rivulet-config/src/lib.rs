//! Runtime configuration for the rivulet streaming runtime.
//!
//! A single TOML file sets how graphs are driven: the per-call output cap,
//! which scheduler runs the blocks, how buffers are allocated and what the
//! binaries log.
//!
//! # Features
//!
//! - **Runtime config**: [`RuntimeConfig`] with `[scheduler]`, `[buffers]` and
//!   `[logging]` sections, every field defaulted
//! - **Validation**: zero sizes and empty filters are rejected before a run
//! - **Paths**: platform config directory and `RIVULET_CONFIG` lookup
//!
//! # Example
//!
//! ```rust
//! use rivulet_config::{BufferKindSetting, RuntimeConfig, SchedulerMode};
//!
//! let config = RuntimeConfig::from_toml_str(
//!     r#"
//!     [scheduler]
//!     mode = "threaded"
//!
//!     [buffers]
//!     kind = "single_mapped"
//!     default_bytes = 8192
//!     "#,
//! )?;
//!
//! assert_eq!(config.scheduler.mode, SchedulerMode::Threaded);
//! assert_eq!(config.buffers.kind, BufferKindSetting::SingleMapped);
//! assert_eq!(config.executor_config().max_noutput_items, 100_000);
//! # Ok::<(), rivulet_config::ConfigError>(())
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

pub use config::{
    BufferKindSetting, BuffersSection, LoggingSection, RuntimeConfig, SchedulerMode,
    SchedulerSection,
};
pub use error::ConfigError;
pub use paths::{CONFIG_ENV_VAR, default_config_path, find_config, user_config_dir};
