//! Configuration loader for eventwatch.
//!
//! Reads `config.toml` from the data directory (`~/.eventwatch/` in
//! production) and deserializes it into [`CatalogConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use eventwatch_types::config::CatalogConfig;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `EVENTWATCH_DATA_DIR` environment variable
/// 2. `~/.eventwatch`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EVENTWATCH_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".eventwatch");
    }

    PathBuf::from(".eventwatch")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`CatalogConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config, with unset fields defaulted.
pub async fn load_config(data_dir: &Path) -> CatalogConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return CatalogConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return CatalogConfig::default();
        }
    };

    let config = match toml::from_str::<CatalogConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return CatalogConfig::default();
        }
    };

    if !(config.dedup.threshold.is_finite() && config.dedup.threshold >= 0.0) {
        tracing::warn!(
            threshold = config.dedup.threshold,
            "Invalid dedup threshold in {}, using defaults",
            config_path.display()
        );
        return CatalogConfig::default();
    }

    config
}

/// Paths derived from the data directory and config.
pub fn records_path(data_dir: &Path, config: &CatalogConfig) -> PathBuf {
    data_dir.join(&config.records_file)
}

pub fn vector_path(data_dir: &Path, config: &CatalogConfig) -> PathBuf {
    data_dir.join(&config.vector_dir)
}
