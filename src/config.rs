// Configuration utilities
//
// This module reads the JSON configuration of the command line host. Service
// settings live in the "services" subtree; a top-level entry with the same
// name is still accepted for older files.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::players::sony::DEFAULT_TIMEOUT_SECS;
use crate::constants::{DEFAULT_NAME, SONY_CONFIG_FILE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings of one Sony player entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SonyPlatformConfig {
    /// Network address of the television
    pub host: String,

    /// Operator-facing label
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

/// Helper function to get service configuration with backward compatibility
///
/// This function first tries to find the service in the "services" structure,
/// then falls back to the old top-level structure.
///
/// # Arguments
/// * `config` - The configuration JSON object
/// * `service_name` - The name of the service to look up (e.g., "pairing_store", "http")
///
/// # Returns
/// * `Option<&serde_json::Value>` - The service configuration if found, None otherwise
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use sonycontrol::config::get_service_config;
///
/// let config = json!({
///   "services": {
///     "http": { "timeout": 10 }
///   }
/// });
///
/// if let Some(http_config) = get_service_config(&config, "http") {
///     assert_eq!(http_config["timeout"], 10);
/// }
///
/// let old_config = json!({
///   "http": { "timeout": 3 }
/// });
///
/// if let Some(http_config) = get_service_config(&old_config, "http") {
///     assert_eq!(http_config["timeout"], 3);
/// }
/// ```
pub fn get_service_config<'a>(config: &'a Value, service_name: &str) -> Option<&'a Value> {
    if let Some(service_config) = config.get("services").and_then(|services| services.get(service_name)) {
        debug!("Found {} configuration in services section", service_name);
        return Some(service_config);
    }

    if let Some(service_config) = config.get(service_name) {
        debug!("Found {} configuration at top level (legacy structure)", service_name);
        return Some(service_config);
    }

    debug!("No {} configuration found in either services section or top level", service_name);
    None
}

/// Load a JSON configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Value, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Configuration with a single Sony player, used when no file is given
pub fn single_player_config(host: &str, name: Option<&str>) -> Value {
    json!({
        "players": [
            {"sony": {"host": host, "name": name.unwrap_or(DEFAULT_NAME)}}
        ]
    })
}

/// Player entries of the configuration
pub fn player_entries(config: &Value) -> Vec<Value> {
    config
        .get("players")
        .and_then(|players| players.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Location of the pairing file
///
/// Relative paths are resolved against `base_dir`, usually the directory of
/// the configuration file.
pub fn pairing_store_path(config: &Value, base_dir: &Path) -> PathBuf {
    let path = get_service_config(config, "pairing_store")
        .and_then(|store| store.get("path"))
        .and_then(|path| path.as_str())
        .unwrap_or(SONY_CONFIG_FILE);

    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// HTTP request timeout in seconds
pub fn http_timeout(config: &Value) -> u64 {
    get_service_config(config, "http")
        .and_then(|http| http.get("timeout"))
        .and_then(|timeout| timeout.as_u64())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}
