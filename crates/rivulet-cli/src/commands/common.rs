//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use rivulet_config::RuntimeConfig;

/// Configuration plus the file it came from, if any.
pub struct LoadedConfig {
    pub config: RuntimeConfig,
    pub path: Option<PathBuf>,
}

/// Load `explicit` if given, otherwise discover the config file.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let (config, path) = match explicit {
        Some(path) => (
            RuntimeConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            Some(path.to_path_buf()),
        ),
        None => RuntimeConfig::discover().context("loading discovered config")?,
    };
    Ok(LoadedConfig { config, path })
}

/// Human-readable item rate.
pub fn format_rate(items_per_sec: f64) -> String {
    if items_per_sec >= 1e9 {
        format!("{:.2} G items/s", items_per_sec / 1e9)
    } else if items_per_sec >= 1e6 {
        format!("{:.2} M items/s", items_per_sec / 1e6)
    } else if items_per_sec >= 1e3 {
        format!("{:.2} k items/s", items_per_sec / 1e3)
    } else {
        format!("{items_per_sec:.0} items/s")
    }
}
