pub mod capabilities;
pub mod player;
pub mod player_command;

pub use capabilities::{PlayerCapability, PlayerCapabilitySet};
pub use player::{LifecycleState, MediaInfo, PlayerState};
pub use player_command::PlayerCommand;
