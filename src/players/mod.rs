/// Player management and functionality for sonycontrol
mod player_controller;
pub mod player_factory;
pub mod sony;

// Re-export the PlayerController trait and related components
pub use player_controller::{PlayerController, BasePlayerController};
pub use player_factory::{create_player_from_json, create_player_from_json_str, player_config_from_json, PlayerCreationError};
pub use sony::SonyMediaPlayer;
