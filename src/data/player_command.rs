/// Commands a host can send to a media player
use serde::{Serialize, Deserialize};
use strum_macros::EnumString;

use super::capabilities::PlayerCapability;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerCommand {
    /// Power commands
    #[serde(rename = "turn_on")]
    #[strum(serialize = "turn_on", serialize = "on")]
    TurnOn,

    #[serde(rename = "turn_off")]
    #[strum(serialize = "turn_off", serialize = "off")]
    TurnOff,

    /// Simple playback commands
    #[serde(rename = "play")]
    Play,

    #[serde(rename = "pause")]
    Pause,

    #[serde(rename = "playpause")]
    #[strum(serialize = "playpause", serialize = "toggle")]
    PlayPause,

    #[serde(rename = "stop")]
    Stop,

    #[serde(rename = "next")]
    Next,

    #[serde(rename = "previous")]
    Previous,
}

impl PlayerCommand {
    /// Capability a player must advertise to accept this command
    pub fn required_capability(&self) -> PlayerCapability {
        match self {
            PlayerCommand::TurnOn => PlayerCapability::TurnOn,
            PlayerCommand::TurnOff => PlayerCapability::TurnOff,
            PlayerCommand::Play | PlayerCommand::PlayPause => PlayerCapability::Play,
            PlayerCommand::Pause => PlayerCapability::Pause,
            PlayerCommand::Stop => PlayerCapability::Stop,
            PlayerCommand::Next => PlayerCapability::Next,
            PlayerCommand::Previous => PlayerCapability::Previous,
        }
    }
}

impl std::fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerCommand::TurnOn => write!(f, "turn_on"),
            PlayerCommand::TurnOff => write!(f, "turn_off"),
            PlayerCommand::Play => write!(f, "play"),
            PlayerCommand::Pause => write!(f, "pause"),
            PlayerCommand::PlayPause => write!(f, "playpause"),
            PlayerCommand::Stop => write!(f, "stop"),
            PlayerCommand::Next => write!(f, "next"),
            PlayerCommand::Previous => write!(f, "previous"),
        }
    }
}
