//! Platform-specific configuration paths.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/rivulet/` (Linux), `~/Library/Application Support/rivulet/` (macOS), `%APPDATA%\rivulet\` (Windows)
//! - **Default file**: `<user config>/config.toml`
//!
//! The `RIVULET_CONFIG` environment variable names a file that takes
//! precedence over the default location.
//!
//! # Example
//!
//! ```rust,no_run
//! use rivulet_config::paths;
//!
//! if let Some(path) = paths::find_config() {
//!     println!("Using config at: {:?}", path);
//! }
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "rivulet";

/// File name of the runtime configuration.
const CONFIG_FILE: &str = "config.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "RIVULET_CONFIG";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default configuration file path, whether or not it exists.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Locate the configuration file to use.
///
/// A non-empty `RIVULET_CONFIG` wins even if the file is missing, so a typo
/// surfaces as a read error instead of silently falling back to defaults.
/// Otherwise the default path is returned if it exists.
pub fn find_config() -> Option<PathBuf> {
    resolve(std::env::var_os(CONFIG_ENV_VAR), default_config_path())
}

fn resolve(env: Option<OsString>, default: PathBuf) -> Option<PathBuf> {
    match env {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => default.is_file().then_some(default),
    }
}
