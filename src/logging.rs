use std::collections::HashMap;
use std::fs;
use std::path::Path;
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use env_logger::{Builder, Target, WriteStyle};
use std::io::Write;

/// Available logging subsystems in sonycontrol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggingSubsystem {
    /// Main application logging
    #[serde(rename = "main")]
    Main,
    /// Player adapter and player factory
    #[serde(rename = "players")]
    Players,
    /// Registration and PIN handling
    #[serde(rename = "pairing")]
    Pairing,
    /// Television protocol client
    #[serde(rename = "device")]
    Device,
    /// HTTP client operations
    #[serde(rename = "http")]
    Http,
    /// Pairing file
    #[serde(rename = "store")]
    Store,
    /// Configuration loading and parsing
    #[serde(rename = "config")]
    Config,
}

impl LoggingSubsystem {
    /// Get the module prefixes for this subsystem
    pub fn module_prefix(&self) -> &'static str {
        match self {
            LoggingSubsystem::Main => "sonycontrol",
            LoggingSubsystem::Players => "sonycontrol::players::player_factory,sonycontrol::players::player_controller,sonycontrol::players::sony::player",
            LoggingSubsystem::Pairing => "sonycontrol::players::sony::pairing,sonycontrol::helpers::configurator",
            LoggingSubsystem::Device => "sonycontrol::players::sony::bravia,sonycontrol::helpers::macaddress",
            LoggingSubsystem::Http => "sonycontrol::helpers::http_client,ureq",
            LoggingSubsystem::Store => "sonycontrol::helpers::pairing_store",
            LoggingSubsystem::Config => "sonycontrol::config",
        }
    }

    /// Get all available subsystems
    pub fn all() -> Vec<LoggingSubsystem> {
        vec![
            LoggingSubsystem::Main,
            LoggingSubsystem::Players,
            LoggingSubsystem::Pairing,
            LoggingSubsystem::Device,
            LoggingSubsystem::Http,
            LoggingSubsystem::Store,
            LoggingSubsystem::Config,
        ]
    }

    /// Parse subsystem name to enum
    pub fn from_name(name: &str) -> Option<LoggingSubsystem> {
        match name.to_lowercase().as_str() {
            "main" => Some(LoggingSubsystem::Main),
            "players" => Some(LoggingSubsystem::Players),
            "pairing" => Some(LoggingSubsystem::Pairing),
            "device" => Some(LoggingSubsystem::Device),
            "http" => Some(LoggingSubsystem::Http),
            "store" => Some(LoggingSubsystem::Store),
            "config" => Some(LoggingSubsystem::Config),
            _ => None,
        }
    }
}

/// Logging configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Target for log output (stdout, stderr)
    #[serde(default = "default_target")]
    pub target: String,

    /// Whether to include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colors: bool,

    /// Subsystem-specific log levels
    #[serde(default, deserialize_with = "deserialize_subsystems")]
    pub subsystems: HashMap<String, String>,

    /// Whether to include module paths in log output
    #[serde(default)]
    pub include_module_path: bool,

    /// Whether to include line numbers in log output
    #[serde(default)]
    pub include_line_numbers: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

/// Custom deserializer for subsystems that filters out keys starting with underscore
fn deserialize_subsystems<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw_map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(raw_map
        .into_iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .collect())
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            target: default_target(),
            timestamps: true,
            colors: true,
            subsystems: HashMap::new(),
            include_module_path: false,
            include_line_numbers: false,
        }
    }
}

impl LoggingConfig {
    /// Load logging configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read logging config file: {}", e))?;
        Self::from_json(&content)
    }

    /// Load logging configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse logging config JSON: {}", e))
    }

    /// Logging section of the main configuration, if present
    pub fn from_config(config: &serde_json::Value) -> Result<Self, String> {
        match config.get("logging") {
            Some(logging) => serde_json::from_value(logging.clone())
                .map_err(|e| format!("Failed to parse logging section: {}", e)),
            None => Ok(Self::default()),
        }
    }

    /// Apply --debug/--verbose command line flags
    pub fn with_overrides(mut self, debug_mode: bool, verbose_mode: bool) -> Self {
        if debug_mode {
            self.level = "debug".to_string();
        } else if verbose_mode && self.level == "info" {
            // verbose only raises our own modules
            self.subsystems.insert("main".to_string(), "debug".to_string());
        }
        self
    }

    /// Convert string log level to LevelFilter
    fn parse_log_level(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => {
                eprintln!("Warning: Unknown log level '{}', defaulting to 'info'", level);
                LevelFilter::Info
            }
        }
    }

    /// Module filters from the subsystem settings, most specific last
    fn module_filters(&self) -> Vec<(String, String)> {
        let mut all_filters = Vec::new();
        for (subsystem_name, level) in &self.subsystems {
            match LoggingSubsystem::from_name(subsystem_name) {
                Some(subsystem) => {
                    for prefix in subsystem.module_prefix().split(',') {
                        all_filters.push((prefix.trim().to_string(), level.clone()));
                    }
                }
                // Allow custom module specifications
                None => all_filters.push((subsystem_name.clone(), level.clone())),
            }
        }

        let mut sorted_filters: Vec<_> = resolve_filter_conflicts(all_filters).into_iter().collect();
        sorted_filters.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        sorted_filters
    }

    /// Build the environment filter string for env_logger
    pub fn build_filter_string(&self) -> String {
        let mut filter_parts = vec![self.level.clone()];
        for (path, level) in self.module_filters() {
            filter_parts.push(format!("{}={}", path, level));
        }
        filter_parts.join(",")
    }

    /// Initialize the logger with this configuration
    pub fn initialize_logger(&self) -> Result<(), String> {
        let filter_string = self.build_filter_string();

        let mut builder = Builder::new();
        builder.filter(None, Self::parse_log_level(&self.level));
        for (path, level) in self.module_filters() {
            builder.filter(Some(&path), Self::parse_log_level(&level));
        }
        // RUST_LOG wins over the configuration
        builder.parse_env("RUST_LOG");

        builder.write_style(if self.colors { WriteStyle::Auto } else { WriteStyle::Never });

        match self.target.to_lowercase().as_str() {
            "stdout" => {
                builder.target(Target::Stdout);
            }
            "stderr" => {
                builder.target(Target::Stderr);
            }
            _ => {
                return Err(format!("Unknown logging target: {}", self.target));
            }
        }

        let include_module_path = self.include_module_path;
        let include_line_numbers = self.include_line_numbers;
        let timestamps = self.timestamps;

        builder.format(move |buf, record| {
            let mut output = String::new();

            if timestamps {
                output.push_str(&format!("[{}] ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
            }

            output.push_str(&format!("[{}] ", record.level()));

            if include_module_path {
                if let Some(module) = record.module_path() {
                    output.push_str(&format!("[{}] ", module));
                }
            }

            if include_line_numbers {
                if let (Some(file), Some(line)) = (record.file(), record.line()) {
                    output.push_str(&format!("[{}:{}] ", file, line));
                }
            }

            output.push_str(&format!("{}", record.args()));

            writeln!(buf, "{}", output)
        });

        builder.try_init()
            .map_err(|e| format!("Failed to initialize logger: {}", e))?;

        debug!("Logging initialized with filter: {}", filter_string);
        Ok(())
    }
}

/// Resolve conflicts when the same module path has multiple log levels
///
/// The most verbose level wins.
fn resolve_filter_conflicts(filters: Vec<(String, String)>) -> HashMap<String, String> {
    let mut path_levels: HashMap<String, Vec<String>> = HashMap::new();
    for (path, level) in filters {
        path_levels.entry(path).or_default().push(level);
    }

    let mut resolved = HashMap::new();
    for (path, levels) in path_levels {
        if levels.len() > 1 {
            let most_verbose = find_most_verbose_level(&levels);
            warn!("Conflicting log levels for module '{}': {:?}. Using most verbose: '{}'",
                  path, levels, most_verbose);
            resolved.insert(path, most_verbose);
        } else if let Some(level) = levels.into_iter().next() {
            resolved.insert(path, level);
        }
    }
    resolved
}

/// Find the most verbose log level from a list of levels
fn find_most_verbose_level(levels: &[String]) -> String {
    // Order from least to most verbose
    let verbosity_order = ["off", "error", "warn", "info", "debug", "trace"];

    levels
        .iter()
        .map(|level| level.to_lowercase())
        .filter_map(|level| verbosity_order.iter().position(|l| *l == level).map(|i| (i, level)))
        .max_by_key(|(index, _)| *index)
        .map(|(_, level)| level)
        .unwrap_or_else(|| "off".to_string())
}

/// Initialize logging from the main configuration and command line flags
pub fn initialize_logging(config: &serde_json::Value, debug_mode: bool, verbose_mode: bool) -> Result<(), String> {
    let logging = LoggingConfig::from_config(config)?.with_overrides(debug_mode, verbose_mode);
    logging.initialize_logger()?;
    if debug_mode {
        info!("Debug mode enabled via command line");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_string_expands_subsystems() {
        let config = LoggingConfig::from_json(r#"{"level": "warn", "subsystems": {"store": "debug", "_pairing": "trace"}}"#).unwrap();
        assert_eq!(config.build_filter_string(), "warn,sonycontrol::helpers::pairing_store=debug");
    }

    #[test]
    fn test_custom_module_filter() {
        let mut config = LoggingConfig::default();
        config.subsystems.insert("ureq".to_string(), "error".to_string());
        assert_eq!(config.build_filter_string(), "info,ureq=error");
    }

    #[test]
    fn test_conflicts_use_most_verbose_level() {
        // "http" and the custom "ureq" entry both cover ureq
        let mut config = LoggingConfig::default();
        config.subsystems.insert("http".to_string(), "warn".to_string());
        config.subsystems.insert("ureq".to_string(), "trace".to_string());
        let filters: HashMap<_, _> = config.module_filters().into_iter().collect();
        assert_eq!(filters["ureq"], "trace");
        assert_eq!(filters["sonycontrol::helpers::http_client"], "warn");
    }

    #[test]
    fn test_most_verbose_level() {
        let levels = vec!["info".to_string(), "DEBUG".to_string(), "bogus".to_string()];
        assert_eq!(find_most_verbose_level(&levels), "debug");
        assert_eq!(find_most_verbose_level(&[]), "off");
    }

    #[test]
    fn test_overrides() {
        let debug = LoggingConfig::default().with_overrides(true, false);
        assert_eq!(debug.level, "debug");

        let verbose = LoggingConfig::default().with_overrides(false, true);
        assert_eq!(verbose.level, "info");
        assert_eq!(verbose.subsystems["main"], "debug");
    }

    #[test]
    fn test_from_config_section() {
        let config = serde_json::json!({"logging": {"level": "error", "colors": false}});
        let logging = LoggingConfig::from_config(&config).unwrap();
        assert_eq!(logging.level, "error");
        assert!(!logging.colors);
        assert!(logging.timestamps);

        let missing = LoggingConfig::from_config(&serde_json::json!({})).unwrap();
        assert_eq!(missing.target, "stderr");
    }

    #[test]
    fn test_all_subsystems_parse_back() {
        for subsystem in LoggingSubsystem::all() {
            let name = serde_json::to_value(subsystem).unwrap();
            assert_eq!(LoggingSubsystem::from_name(name.as_str().unwrap()), Some(subsystem));
        }
    }
}
