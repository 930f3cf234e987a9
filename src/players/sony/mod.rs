//! Sony television support: device client, player adapter and pairing
pub mod bravia;
pub mod device;
pub mod pairing;
pub mod player;

#[cfg(test)]
pub(crate) mod testing;


pub use bravia::{BraviaDescriptor, BraviaDevice, BraviaDeviceFactory, DEFAULT_TIMEOUT_SECS};
pub use device::{AuthenticationResult, DeviceError, DeviceFactory, SonyDevice};
pub use pairing::{PairingError, PairingManager, PinOutcome, RegistrationSession, Resolution, SessionPhase};
pub use player::SonyMediaPlayer;
