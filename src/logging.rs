//! File logging
//!
//! The terminal belongs to the TUI, so log lines go to
//! ~/.local/share/dailyspark-admin/dailyspark-admin.log instead of stderr.
//! `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dailyspark_admin=info";

/// Get the log file path
pub fn log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .context("Could not determine data directory")?
        .join("dailyspark-admin");
    Ok(data_dir.join("dailyspark-admin.log"))
}

/// Install the global subscriber writing to `path` (appending)
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_file_name() {
        if let Ok(path) = log_path() {
            assert!(path.ends_with("dailyspark-admin/dailyspark-admin.log"));
        }
    }
}
