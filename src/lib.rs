/// Player states, capabilities and commands
pub mod data;

/// Configuration utilities with backward compatibility support
pub mod config;

/// Player implementation and controllers
pub mod players;

/// Helper utilities for HTTP, prompts and pairing persistence
pub mod helpers;

/// Logging configuration and utilities
pub mod logging;

/// Global constants
pub mod constants;

pub use crate::data::{LifecycleState, PlayerCommand};
pub use crate::players::PlayerController;
pub use crate::players::sony::{PairingManager, PinOutcome, Resolution, SonyMediaPlayer};
