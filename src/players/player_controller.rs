use crate::data::{LifecycleState, MediaInfo, PlayerCapability, PlayerCapabilitySet, PlayerCommand, PlayerState};
use crate::players::sony::DeviceError;
use std::sync::Arc;
use parking_lot::RwLock;
use std::any::Any;
use std::time::SystemTime;
use log::debug;

/// PlayerController trait - abstract interface for player implementations
///
/// This trait is the media player entity contract a host works against:
/// it polls the player through `refresh` and invokes transport operations
/// through `send_command`.
pub trait PlayerController: Send + Sync {
    /// Get the capabilities of the player
    ///
    /// Returns a PlayerCapabilitySet with the capabilities supported by this player
    fn get_capabilities(&self) -> PlayerCapabilitySet;

    /// Get the current lifecycle state
    ///
    /// Returns the state computed by the last refresh or command
    fn get_lifecycle_state(&self) -> LifecycleState;

    /// Get the name of this player controller
    ///
    /// Returns a string identifier for this type of player (e.g., "sony")
    fn get_player_name(&self) -> String;

    /// Get a unique identifier for this player instance
    ///
    /// Returns a string that uniquely identifies this player instance
    fn get_player_id(&self) -> String;

    /// Get the operator-facing label of this player
    fn get_display_name(&self) -> String;

    /// Get the last time this player was seen active
    ///
    /// Returns the timestamp of the last successful poll, or None if the
    /// device has never answered
    fn get_last_seen(&self) -> Option<SystemTime>;

    /// Poll the device and recompute the lifecycle state
    ///
    /// Never fails; an unreachable device is reported as off.
    fn refresh(&self);

    /// Send a command to the player
    ///
    /// # Arguments
    ///
    /// * `command` - The command to send to the player
    ///
    /// # Returns
    ///
    /// `Ok(())` once the device accepted the command, the device error otherwise
    fn send_command(&self, command: PlayerCommand) -> Result<(), DeviceError>;

    /// Get metadata about the media on screen
    ///
    /// Default implementation returns empty metadata
    fn get_media_info(&self) -> MediaInfo {
        MediaInfo::default()
    }

    /// Check if the player supports a capability
    fn has_capability(&self, capability: PlayerCapability) -> bool {
        self.get_capabilities().has_capability(capability)
    }

    /// Downcasts the player controller to a concrete type via Any
    ///
    /// This allows accessing implementation-specific functionality when needed.
    fn as_any(&self) -> &dyn Any;
}

/// Base implementation of PlayerController state handling
///
/// This struct provides the identity, capability and state bookkeeping that
/// concrete player implementations delegate to.
#[derive(Clone)]
pub struct BasePlayerController {
    /// Current capabilities of the player
    capabilities: Arc<RwLock<PlayerCapabilitySet>>,

    /// Player name identifier (e.g., "sony")
    player_name: Arc<RwLock<String>>,

    /// Player unique ID (e.g., "sony:10.0.0.5")
    player_id: Arc<RwLock<String>>,

    /// Player state
    player_state: Arc<RwLock<PlayerState>>,
}

impl Default for BasePlayerController {
    fn default() -> Self {
        Self::new()
    }
}

impl BasePlayerController {
    /// Create a new BasePlayerController
    pub fn new() -> Self {
        Self::with_player_info("unknown", "unknown")
    }

    /// Initialize the controller with player name and ID
    pub fn with_player_info(name: &str, id: &str) -> Self {
        debug!("Creating BasePlayerController with name='{}', id='{}'", name, id);
        Self {
            capabilities: Arc::new(RwLock::new(PlayerCapabilitySet::empty())),
            player_name: Arc::new(RwLock::new(name.to_string())),
            player_id: Arc::new(RwLock::new(id.to_string())),
            player_state: Arc::new(RwLock::new(PlayerState::new())),
        }
    }

    /// Get the player name
    pub fn get_player_name(&self) -> String {
        self.player_name.read().clone()
    }

    /// Get the player ID
    pub fn get_player_id(&self) -> String {
        self.player_id.read().clone()
    }

    /// Get the current capabilities
    pub fn get_capabilities(&self) -> PlayerCapabilitySet {
        *self.capabilities.read()
    }

    /// Set multiple capabilities at once using a PlayerCapabilitySet
    ///
    /// Replaces all current capabilities with the provided ones.
    /// Returns true if the capabilities were changed
    pub fn set_capabilities_set(&self, capabilities: PlayerCapabilitySet) -> bool {
        let mut caps = self.capabilities.write();
        if *caps == capabilities {
            debug!("Capabilities unchanged, not updating");
            return false;
        }
        *caps = capabilities;
        self.player_state.write().capabilities = capabilities;
        debug!("Updated capabilities to {}", capabilities);
        true
    }

    /// Set multiple capabilities at once using a Vec of PlayerCapability
    pub fn set_capabilities(&self, capabilities: Vec<PlayerCapability>) -> bool {
        debug!("Setting all capabilities to a list of {} capabilities", capabilities.len());
        self.set_capabilities_set(PlayerCapabilitySet::from_slice(&capabilities))
    }

    /// Get the current lifecycle state
    pub fn get_lifecycle_state(&self) -> LifecycleState {
        self.player_state.read().state
    }

    /// Get a copy of the full player state
    pub fn get_player_state(&self) -> PlayerState {
        self.player_state.read().clone()
    }

    /// Update the lifecycle state, notifying when it changed
    ///
    /// Returns true if the state was changed
    pub fn set_state(&self, state: LifecycleState) -> bool {
        let mut player_state = self.player_state.write();
        if player_state.state == state {
            return false;
        }
        let previous = player_state.state;
        player_state.state = state;
        drop(player_state);

        self.notify_state_changed(previous, state);
        true
    }

    /// Record a successful device poll
    pub fn alive(&self) {
        self.player_state.write().last_seen = Some(SystemTime::now());
    }

    /// Get the last time the device answered
    pub fn get_last_seen(&self) -> Option<SystemTime> {
        self.player_state.read().last_seen
    }

    /// Report a state transition
    pub fn notify_state_changed(&self, previous: LifecycleState, state: LifecycleState) {
        debug!("Player {} changed state: {} -> {}", self.get_player_id(), previous, state);
    }
}
