//! Device-facing surface of a Sony television
//!
//! The player adapter and the pairing flow only talk to a television through
//! these traits, so the wire protocol can be swapped out or mocked.

use serde_json::Value;
use thiserror::Error;

use crate::helpers::http_client::HttpClientError;

/// Highest registration mode that works without a PIN (pre-2013 devices)
pub const LEGACY_AUTH_MODE_MAX: u32 = 3;

/// Errors reported by a device client
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpClientError),

    #[error("Device returned error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Command {0} is not supported by this device")]
    UnknownCommand(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Wake-on-LAN failed: {0}")]
    WakeOnLan(String),
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationResult {
    /// Device accepted the client without a PIN
    Success,
    /// Device now shows a PIN which has to be submitted
    PinNeeded,
    /// Registration was refused for another reason
    Error,
}

/// Remote control surface of a single television
pub trait SonyDevice: Send + Sync + std::fmt::Debug {
    /// Host address of the device
    fn host(&self) -> String;

    /// Name this client registered with
    fn nickname(&self) -> String;

    /// Credential obtained during pairing
    fn pin(&self) -> Option<String>;

    fn set_pin(&self, pin: Option<String>);

    /// MAC address used to wake the device
    fn mac(&self) -> Option<String>;

    fn set_mac(&self, mac: Option<String>);

    /// Resolve the control endpoints and command table of the device
    fn update_service_urls(&self) -> Result<(), DeviceError>;

    /// Whether the device is powered on
    fn get_power_status(&self) -> Result<bool, DeviceError>;

    /// Transport state string, e.g. "PLAYING" or "PAUSED_PLAYBACK"
    fn get_playing_status(&self) -> Result<String, DeviceError>;

    fn power(&self, on: bool) -> Result<(), DeviceError>;

    fn play(&self) -> Result<(), DeviceError>;

    fn pause(&self) -> Result<(), DeviceError>;

    fn next(&self) -> Result<(), DeviceError>;

    fn prev(&self) -> Result<(), DeviceError>;

    fn stop(&self) -> Result<(), DeviceError>;

    /// Start registration; the device may answer by showing a PIN
    fn register(&self) -> Result<AuthenticationResult, DeviceError>;

    /// Submit the PIN shown on screen; `true` if the device accepted it
    fn send_authentication(&self, pin: &str) -> Result<bool, DeviceError>;

    /// Registration mode of the device; modes above 3 require a PIN
    fn get_registration_auth_mode(&self) -> Result<u32, DeviceError>;

    /// Serialized device identity for the pairing store
    fn save_to_json(&self) -> Result<Value, DeviceError>;
}

/// Creates device handles, either fresh or from a stored identity
pub trait DeviceFactory: Send + Sync {
    fn create(&self, host: &str, nickname: &str) -> Box<dyn SonyDevice>;

    fn load_from_json(&self, device: &Value) -> Result<Box<dyn SonyDevice>, DeviceError>;
}

/// Whether a device with this registration mode needs a PIN
pub fn auth_mode_requires_pin(auth_mode: u32) -> bool {
    auth_mode > LEGACY_AUTH_MODE_MAX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_threshold() {
        assert!(!auth_mode_requires_pin(1));
        assert!(!auth_mode_requires_pin(3));
        assert!(auth_mode_requires_pin(4));
    }

    #[test]
    fn test_http_error_conversion() {
        let err: DeviceError = HttpClientError::Status(403, "Forbidden".to_string()).into();
        assert!(matches!(err, DeviceError::Http(_)));
        assert_eq!(err.to_string(), "HTTP error: HTTP status 403: Forbidden");
    }
}
