/// Player state as seen by the host
use std::time::SystemTime;
use serde::{Serialize, Deserialize};
use strum_macros::EnumString;

use super::capabilities::{PlayerCapability, PlayerCapabilitySet};

/// Transport state reported by the device while media is playing
pub const TRANSPORT_PLAYING: &str = "PLAYING";

/// Transport state reported by the device while playback is paused
pub const TRANSPORT_PAUSED: &str = "PAUSED_PLAYBACK";

/// Lifecycle states a media player entity can be in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[derive(Default)]
pub enum LifecycleState {
    /// Device is powered down or unreachable
    #[default]
    Off,
    /// Device is powered on but not playing anything
    On,
    /// Device is playing media
    Playing,
    /// Playback is paused
    Paused,
}

impl LifecycleState {
    /// Map a transport state string of a powered-on device to a lifecycle state
    ///
    /// Anything other than playing or paused, including an empty string,
    /// means the device is simply on.
    pub fn from_transport_state(transport_state: &str) -> Self {
        match transport_state {
            TRANSPORT_PLAYING => LifecycleState::Playing,
            TRANSPORT_PAUSED => LifecycleState::Paused,
            _ => LifecycleState::On,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Off => write!(f, "off"),
            LifecycleState::On => write!(f, "on"),
            LifecycleState::Playing => write!(f, "playing"),
            LifecycleState::Paused => write!(f, "paused"),
        }
    }
}

/// Now-playing metadata exposed to the host
///
/// Sony remote control services do not report what is on screen, so every
/// field stays empty for this adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaInfo {
    pub title: String,
    pub content_id: String,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub state: LifecycleState,

    #[serde(default, skip_serializing_if = "PlayerCapabilitySet::is_empty")]
    pub capabilities: PlayerCapabilitySet,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<SystemTime>, // last successful device poll
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    /// Create a new PlayerState, starting in the off state
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Off,
            capabilities: PlayerCapabilitySet::empty(),
            last_seen: None,
        }
    }

    /// Check if the player has a specific capability
    pub fn has_capability(&self, capability: PlayerCapability) -> bool {
        self.capabilities.has_capability(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_transport_state_mapping() {
        assert_eq!(LifecycleState::from_transport_state("PLAYING"), LifecycleState::Playing);
        assert_eq!(LifecycleState::from_transport_state("PAUSED_PLAYBACK"), LifecycleState::Paused);
        assert_eq!(LifecycleState::from_transport_state("STOPPED"), LifecycleState::On);
        assert_eq!(LifecycleState::from_transport_state("NO_MEDIA_PRESENT"), LifecycleState::On);
        assert_eq!(LifecycleState::from_transport_state(""), LifecycleState::On);
        // Matching is exact
        assert_eq!(LifecycleState::from_transport_state("playing"), LifecycleState::On);
    }

    #[test]
    fn test_state_strings() {
        assert_eq!(LifecycleState::Paused.to_string(), "paused");
        assert_eq!(LifecycleState::from_str("playing").unwrap(), LifecycleState::Playing);
        assert_eq!(serde_json::to_string(&LifecycleState::On).unwrap(), "\"on\"");
    }

    #[test]
    fn test_new_state_is_off() {
        let state = PlayerState::new();
        assert_eq!(state.state, LifecycleState::Off);
        assert!(state.last_seen.is_none());
        assert_eq!(MediaInfo::default().title, "");
    }
}
