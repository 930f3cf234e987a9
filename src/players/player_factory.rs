use crate::config::SonyPlatformConfig;
use crate::players::sony::{PairingError, PairingManager, Resolution};
use log::debug;
use serde_json::Value;
use std::error::Error;
use std::fmt;

/// Error type for player creation
#[derive(Debug)]
pub enum PlayerCreationError {
    InvalidType(String),
    MissingField(String),
    ParseError(String),
    Disabled(String),
    Pairing(PairingError),
}

impl fmt::Display for PlayerCreationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayerCreationError::InvalidType(s) => write!(f, "Invalid player type: {}", s),
            PlayerCreationError::MissingField(s) => write!(f, "Missing required field: {}", s),
            PlayerCreationError::ParseError(s) => write!(f, "Error parsing config: {}", s),
            PlayerCreationError::Disabled(s) => write!(f, "Player {} is disabled", s),
            PlayerCreationError::Pairing(e) => write!(f, "Pairing failed: {}", e),
        }
    }
}

impl Error for PlayerCreationError {}

impl From<PairingError> for PlayerCreationError {
    fn from(e: PairingError) -> Self {
        PlayerCreationError::Pairing(e)
    }
}

/// Read the platform configuration of a single player entry
///
/// The entry is an object with the player type as its only key, e.g.
/// `{"sony": {"host": "10.0.0.5", "name": "Living Room TV"}}`.
pub fn player_config_from_json(config: &Value) -> Result<SonyPlatformConfig, PlayerCreationError> {
    // Expect a single key-value pair where key is the player type
    let (player_type, config_obj) = config
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| PlayerCreationError::ParseError("Expected object with player type as key".to_string()))?;

    // Filter out players that start with underscore (commented/disabled convention)
    if player_type.starts_with('_') {
        return Err(PlayerCreationError::Disabled(format!("{} (starts with underscore)", player_type)));
    }

    // Check if the player is enabled (default to true if not specified)
    let enabled = config_obj.get("enable")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    if !enabled {
        return Err(PlayerCreationError::Disabled(player_type.to_string()));
    }

    match player_type.as_str() {
        "sony" => {
            if config_obj.get("host").and_then(|v| v.as_str()).is_none() {
                return Err(PlayerCreationError::MissingField("host".to_string()));
            }
            serde_json::from_value(config_obj.clone())
                .map_err(|e| PlayerCreationError::ParseError(e.to_string()))
        },
        unknown => Err(PlayerCreationError::InvalidType(unknown.to_string())),
    }
}

/// Factory function for creating a player from a configuration entry
///
/// Returns `Resolution::Pending` while the television still has to be paired.
pub fn create_player_from_json(config: &Value, manager: &PairingManager) -> Result<Resolution, PlayerCreationError> {
    let platform = player_config_from_json(config)?;
    debug!("Creating Sony player for {} ({})", platform.host, platform.name);
    Ok(manager.resolve_device(&platform.host, &platform.name)?)
}

/// Helper function to create a player from a JSON string
pub fn create_player_from_json_str(json_str: &str, manager: &PairingManager) -> Result<Resolution, Box<dyn Error>> {
    let config: Value = serde_json::from_str(json_str)?;
    Ok(create_player_from_json(&config, manager)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sony_config_with_default_name() {
        let platform = player_config_from_json(&json!({"sony": {"host": "10.0.0.5"}})).unwrap();
        assert_eq!(platform.host, "10.0.0.5");
        assert_eq!(platform.name, "Sony Media Player");
    }

    #[test]
    fn test_sony_config_with_name() {
        let platform =
            player_config_from_json(&json!({"sony": {"host": "10.0.0.5", "name": "Living Room TV"}})).unwrap();
        assert_eq!(platform.name, "Living Room TV");
    }

    #[test]
    fn test_missing_host() {
        let result = player_config_from_json(&json!({"sony": {"name": "TV"}}));
        assert!(matches!(result, Err(PlayerCreationError::MissingField(ref f)) if f == "host"));
    }

    #[test]
    fn test_disabled_and_commented_players() {
        let disabled = player_config_from_json(&json!({"sony": {"host": "10.0.0.5", "enable": false}}));
        assert!(matches!(disabled, Err(PlayerCreationError::Disabled(_))));

        let commented = player_config_from_json(&json!({"_sony": {"host": "10.0.0.5"}}));
        assert!(matches!(commented, Err(PlayerCreationError::Disabled(_))));
    }

    #[test]
    fn test_unknown_type() {
        let result = player_config_from_json(&json!({"mpd": {"host": "localhost"}}));
        assert!(matches!(result, Err(PlayerCreationError::InvalidType(ref t)) if t == "mpd"));
    }

    #[test]
    fn test_not_an_object() {
        let result = player_config_from_json(&json!(["sony"]));
        assert!(matches!(result, Err(PlayerCreationError::ParseError(_))));
    }
}
