use std::any::Any;
use std::time::SystemTime;

use delegate::delegate;
use log::{debug, info, warn};

use crate::data::{LifecycleState, PlayerCapability, PlayerCapabilitySet, PlayerCommand};
use crate::players::player_controller::{BasePlayerController, PlayerController};
use super::device::{DeviceError, DeviceFactory, SonyDevice};

/// Capabilities every Sony television exposes
pub const SONY_CAPABILITIES: [PlayerCapability; 7] = [
    PlayerCapability::Pause,
    PlayerCapability::Previous,
    PlayerCapability::Next,
    PlayerCapability::TurnOn,
    PlayerCapability::TurnOff,
    PlayerCapability::Play,
    PlayerCapability::Stop,
];

/// Media player entity for a paired Sony television
pub struct SonyMediaPlayer {
    /// Base controller providing identity and state bookkeeping
    base: BasePlayerController,

    host: String,

    /// Operator-facing label
    display_name: String,

    device: Box<dyn SonyDevice>,
}

impl SonyMediaPlayer {
    /// Create a player for a paired device
    ///
    /// A fresh device handle is built and given the stored credential and MAC.
    pub fn new(factory: &dyn DeviceFactory, host: &str, name: &str, pin: Option<String>, mac: Option<String>) -> Self {
        let device = factory.create(host, name);
        device.set_pin(pin);
        device.set_mac(mac);
        Self::with_device(host, name, device)
    }

    /// Create a player around an existing device handle
    ///
    /// Resolves the device endpoints and does a first refresh; a device that
    /// cannot be reached leaves the player off.
    pub fn with_device(host: &str, name: &str, device: Box<dyn SonyDevice>) -> Self {
        let base = BasePlayerController::with_player_info("sony", &format!("sony:{}", host));
        base.set_capabilities(SONY_CAPABILITIES.to_vec());

        let player = Self {
            base,
            host: host.to_string(),
            display_name: name.to_string(),
            device,
        };

        if let Err(e) = player.device.update_service_urls() {
            warn!("Could not resolve services of {} ({}): {}", player.display_name, host, e);
        }
        player.refresh();

        info!("Created Sony player {} for {} in state {}", player.display_name, host, player.get_lifecycle_state());
        player
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Underlying device handle
    pub fn device(&self) -> &dyn SonyDevice {
        self.device.as_ref()
    }

    fn query_state(&self) -> Result<LifecycleState, DeviceError> {
        if !self.device.get_power_status()? {
            return Ok(LifecycleState::Off);
        }
        let transport_state = self.device.get_playing_status()?;
        debug!("Transport state of {}: '{}'", self.host, transport_state);
        Ok(LifecycleState::from_transport_state(&transport_state))
    }

    pub fn turn_on(&self) -> Result<(), DeviceError> {
        self.device.power(true)
    }

    pub fn turn_off(&self) -> Result<(), DeviceError> {
        self.device.power(false)
    }

    /// Start playback; the state is set before the device confirms it
    pub fn play(&self) -> Result<(), DeviceError> {
        self.base.set_state(LifecycleState::Playing);
        self.device.play()
    }

    /// Pause playback; the state is set before the device confirms it
    pub fn pause(&self) -> Result<(), DeviceError> {
        self.base.set_state(LifecycleState::Paused);
        self.device.pause()
    }

    /// Pause while playing, play otherwise
    pub fn play_pause(&self) -> Result<(), DeviceError> {
        if self.get_lifecycle_state() == LifecycleState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn next(&self) -> Result<(), DeviceError> {
        self.device.next()
    }

    pub fn previous(&self) -> Result<(), DeviceError> {
        self.device.prev()
    }

    pub fn stop(&self) -> Result<(), DeviceError> {
        self.device.stop()
    }
}

impl PlayerController for SonyMediaPlayer {
    delegate! {
        to self.base {
            fn get_capabilities(&self) -> PlayerCapabilitySet;
            fn get_lifecycle_state(&self) -> LifecycleState;
            fn get_player_name(&self) -> String;
            fn get_player_id(&self) -> String;
            fn get_last_seen(&self) -> Option<SystemTime>;
        }
    }

    fn get_display_name(&self) -> String {
        self.display_name.clone()
    }

    fn refresh(&self) {
        match self.query_state() {
            Ok(state) => {
                self.base.alive();
                self.base.set_state(state);
            }
            Err(e) => {
                warn!("No response from {} ({}): {}", self.display_name, self.host, e);
                self.base.set_state(LifecycleState::Off);
            }
        }
    }

    fn send_command(&self, command: PlayerCommand) -> Result<(), DeviceError> {
        if !self.has_capability(command.required_capability()) {
            return Err(DeviceError::UnknownCommand(command.to_string()));
        }

        info!("Sending command {} to {}", command, self.display_name);
        match command {
            PlayerCommand::TurnOn => self.turn_on(),
            PlayerCommand::TurnOff => self.turn_off(),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::PlayPause => self.play_pause(),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Next => self.next(),
            PlayerCommand::Previous => self.previous(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
