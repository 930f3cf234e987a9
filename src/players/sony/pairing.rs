//! Pairing of Sony televisions
//!
//! A host is either resolved from its stored pairing record or goes through
//! an interactive registration: the operator is prompted for the PIN the
//! television shows, the PIN is submitted to the device and the resulting
//! identity is persisted so later runs skip this step.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    PIN_DESCRIPTION, PIN_DESCRIPTION_IMAGE, PIN_FIELD_ID, PIN_FIELD_NAME, PIN_REQUEST, PIN_SUBMIT_CAPTION,
    REGISTRATION_RETRY_MESSAGE,
};
use crate::helpers::configurator::{ConfigField, ConfigRequest, Configurator, RequestId};
use crate::helpers::pairing_store::{DeviceRecord, PairingStore, PairingStoreError};
use super::device::{auth_mode_requires_pin, AuthenticationResult, DeviceError, DeviceFactory, SonyDevice};
use super::player::SonyMediaPlayer;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Registration of {0} is already in progress")]
    RegistrationInProgress(String),

    #[error("No registration pending for {0}")]
    NoPendingRegistration(String),

    #[error("Pairing store error: {0}")]
    Store(#[from] PairingStoreError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// Where a pending registration currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Prompt shown, nothing submitted yet
    Prompting,
    /// The device has been asked to show a PIN
    AwaitingDevicePin,
    /// The last submission was not accepted
    Failed,
}

/// State of one pending registration, kept across prompt submissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSession {
    pub host: String,
    pub display_name: String,
    pub request_id: RequestId,
    pub last_error: Option<String>,
    /// Submissions the device did not accept
    pub attempt_count: u32,
    pub phase: SessionPhase,
}

impl RegistrationSession {
    fn new(host: &str, display_name: &str, request_id: RequestId) -> Self {
        Self {
            host: host.to_string(),
            display_name: display_name.to_string(),
            request_id,
            last_error: None,
            attempt_count: 0,
            phase: SessionPhase::Prompting,
        }
    }
}

/// Slot of a host in the registry
#[derive(Debug)]
enum Slot {
    /// Prompt is being opened, no request id yet
    Reserved,
    Open(RegistrationSession),
}

/// Pending registrations by host
#[derive(Debug, Default)]
pub struct RegistrationRegistry {
    sessions: Mutex<HashMap<String, Slot>>,
}

impl RegistrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, host: &str) -> Option<RegistrationSession> {
        match self.sessions.lock().get(host) {
            Some(Slot::Open(session)) => Some(session.clone()),
            _ => None,
        }
    }

    /// Whether a registration for the host is pending, including one whose
    /// prompt is still being opened
    pub fn contains(&self, host: &str) -> bool {
        self.sessions.lock().contains_key(host)
    }

    pub fn remove(&self, host: &str) -> Option<RegistrationSession> {
        let mut sessions = self.sessions.lock();
        if !matches!(sessions.get(host), Some(Slot::Open(_))) {
            return None;
        }
        match sessions.remove(host) {
            Some(Slot::Open(session)) => Some(session),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Claim the host for a new registration
    ///
    /// Check and claim happen under one lock. If the host is already taken,
    /// the request id of its open prompt is returned as the error (`None`
    /// while that prompt is still being opened).
    fn reserve(&self, host: &str) -> Result<(), Option<RequestId>> {
        let mut sessions = self.sessions.lock();
        match sessions.get(host) {
            Some(Slot::Open(existing)) => Err(Some(existing.request_id)),
            Some(Slot::Reserved) => Err(None),
            None => {
                sessions.insert(host.to_string(), Slot::Reserved);
                Ok(())
            }
        }
    }

    /// Store the session of a reserved host once its prompt is open
    fn open(&self, session: RegistrationSession) {
        self.sessions.lock().insert(session.host.clone(), Slot::Open(session));
    }

    /// Apply `update` to the session of a host, if it is still pending
    fn update<F>(&self, host: &str, update: F) -> Option<RegistrationSession>
    where
        F: FnOnce(&mut RegistrationSession),
    {
        match self.sessions.lock().get_mut(host) {
            Some(Slot::Open(session)) => {
                update(session);
                Some(session.clone())
            }
            _ => None,
        }
    }
}

/// What the device said to one PIN submission
enum Attempt {
    Authenticated,
    PinNeeded,
    Refused,
}

/// Result of resolving a host
pub enum Resolution {
    /// Stored pairing found, player is ready
    Ready(Box<SonyMediaPlayer>),
    /// Registration started, waiting for the operator's PIN
    Pending(RequestId),
}

/// Result of a PIN submission
pub enum PinOutcome {
    /// Device accepted the client; record stored and player created
    Paired(Box<SonyMediaPlayer>),
    /// Device now shows a PIN; submit it next
    PinNeeded,
    /// Not authenticated; the prompt stays open for another try
    Rejected,
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Ready(player) => write!(f, "Ready({})", player.host()),
            Resolution::Pending(request_id) => write!(f, "Pending({})", request_id),
        }
    }
}

impl std::fmt::Debug for PinOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinOutcome::Paired(player) => write!(f, "Paired({})", player.host()),
            PinOutcome::PinNeeded => write!(f, "PinNeeded"),
            PinOutcome::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Resolves hosts to ready players and drives registration
pub struct PairingManager {
    factory: Arc<dyn DeviceFactory>,
    configurator: Arc<dyn Configurator>,
    store: PairingStore,
    registry: RegistrationRegistry,
}

impl PairingManager {
    pub fn new(factory: Arc<dyn DeviceFactory>, configurator: Arc<dyn Configurator>, store: PairingStore) -> Self {
        Self {
            factory,
            configurator,
            store,
            registry: RegistrationRegistry::new(),
        }
    }

    pub fn store(&self) -> &PairingStore {
        &self.store
    }

    pub fn registry(&self) -> &RegistrationRegistry {
        &self.registry
    }

    /// Build a player from the stored record, or start registration
    pub fn resolve_device(&self, host: &str, display_name: &str) -> Result<Resolution, PairingError> {
        if let Some(record) = self.store.get(host)? {
            debug!("Found pairing record for {}", host);
            let device = self.factory.load_from_json(&record.device)?;
            let player = SonyMediaPlayer::with_device(host, display_name, device);
            return Ok(Resolution::Ready(Box::new(player)));
        }

        info!("No pairing record for {}, starting registration", host);
        let request_id = self.begin_registration(host, display_name)?;
        Ok(Resolution::Pending(request_id))
    }

    /// Prompt the operator for a PIN
    ///
    /// The host is reserved before the prompt is opened, so the configurator
    /// is called without the registry lock held.
    pub fn begin_registration(&self, host: &str, display_name: &str) -> Result<RequestId, PairingError> {
        if let Err(existing) = self.registry.reserve(host) {
            if let Some(request_id) = existing {
                self.configurator.notify_errors(request_id, REGISTRATION_RETRY_MESSAGE);
            }
            warn!("Registration of {} is already in progress", host);
            return Err(PairingError::RegistrationInProgress(host.to_string()));
        }

        let request_id = self.configurator.request_config(pin_request(display_name));
        self.registry.open(RegistrationSession::new(host, display_name, request_id));
        info!("Requested PIN for {} ({}), request {}", display_name, host, request_id);
        Ok(request_id)
    }

    /// Handle a PIN submitted on the prompt of `host`
    ///
    /// Device errors do not end the flow: they are reported on the prompt
    /// like a refused PIN and the operator can try again.
    pub fn submit_pin(&self, host: &str, pin: Option<&str>) -> Result<PinOutcome, PairingError> {
        let session = self
            .registry
            .get(host)
            .ok_or_else(|| PairingError::NoPendingRegistration(host.to_string()))?;

        let pin = pin.filter(|p| !p.is_empty());
        let device = self.factory.create(host, &session.display_name);

        match self.authenticate(host, device.as_ref(), pin) {
            Ok(Attempt::Authenticated) => {
                device.set_pin(pin.map(|p| p.to_string()));
                Ok(PinOutcome::Paired(Box::new(self.complete(&session, device))))
            }
            Ok(Attempt::PinNeeded) => {
                info!("{} is showing a PIN, waiting for submission", host);
                self.registry.update(host, |s| {
                    s.phase = SessionPhase::AwaitingDevicePin;
                    s.last_error = None;
                });
                Ok(PinOutcome::PinNeeded)
            }
            Ok(Attempt::Refused) => Ok(self.reject(host, REGISTRATION_RETRY_MESSAGE.to_string())),
            Err(e) => {
                error!("Registration with {} failed: {}", host, e);
                Ok(self.reject(host, e.to_string()))
            }
        }
    }

    fn authenticate(&self, host: &str, device: &dyn SonyDevice, pin: Option<&str>) -> Result<Attempt, DeviceError> {
        let auth_mode = device.get_registration_auth_mode()?;
        let mut authenticated = false;

        if pin.map_or(true, |p| p == PIN_REQUEST) {
            match device.register() {
                Ok(AuthenticationResult::Success) => authenticated = true,
                Ok(AuthenticationResult::PinNeeded) => return Ok(Attempt::PinNeeded),
                Ok(AuthenticationResult::Error) => {
                    error!("An unknown error occurred during registration");
                }
                Err(e) => {
                    error!("An unknown error occurred during registration: {}", e);
                }
            }
        }

        debug!("auth_mode: {} - pin given: {}", auth_mode, pin.is_some());

        // devices with a lower mode do not take a PIN
        if auth_mode_requires_pin(auth_mode) {
            authenticated = match pin {
                Some(pin) => device.send_authentication(pin)?,
                None => {
                    debug!("No PIN to send to {}", host);
                    false
                }
            };
        }

        Ok(if authenticated { Attempt::Authenticated } else { Attempt::Refused })
    }

    /// Abort a pending registration and close its prompt
    pub fn cancel_registration(&self, host: &str) -> bool {
        match self.registry.remove(host) {
            Some(session) => {
                self.configurator.request_done(session.request_id);
                info!("Cancelled registration of {}", host);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, host: &str) -> bool {
        self.registry.contains(host)
    }

    pub fn session(&self, host: &str) -> Option<RegistrationSession> {
        self.registry.get(host)
    }

    fn complete(&self, session: &RegistrationSession, device: Box<dyn SonyDevice>) -> SonyMediaPlayer {
        if let Some(done) = self.registry.remove(&session.host) {
            self.configurator.request_done(done.request_id);
            info!("Registration of {} done", session.host);
        }

        let player = SonyMediaPlayer::with_device(&session.host, &session.display_name, device);

        // the stored identity carries the MAC needed for wake-on-LAN
        let saved = player
            .device()
            .save_to_json()
            .map_err(PairingError::from)
            .and_then(|device| {
                self.store
                    .save(&session.host, DeviceRecord::new(device))
                    .map_err(PairingError::from)
            });
        if let Err(e) = saved {
            error!("Could not save pairing of {}: {}", session.host, e);
        }

        player
    }

    fn reject(&self, host: &str, reason: String) -> PinOutcome {
        let session = self.registry.update(host, |s| {
            s.phase = SessionPhase::Failed;
            s.last_error = Some(reason);
            s.attempt_count += 1;
        });
        if let Some(session) = session {
            warn!("Registration of {} failed (attempt {})", host, session.attempt_count);
            self.configurator.notify_errors(session.request_id, REGISTRATION_RETRY_MESSAGE);
        }
        PinOutcome::Rejected
    }
}

/// The form asking for the PIN
pub fn pin_request(display_name: &str) -> ConfigRequest {
    ConfigRequest {
        name: display_name.to_string(),
        description: PIN_DESCRIPTION.to_string(),
        description_image: Some(PIN_DESCRIPTION_IMAGE.to_string()),
        submit_caption: PIN_SUBMIT_CAPTION.to_string(),
        fields: vec![ConfigField::text(PIN_FIELD_ID, PIN_FIELD_NAME)],
    }
}
