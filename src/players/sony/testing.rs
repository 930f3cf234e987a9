//! In-memory television, device factory and prompt host for tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::helpers::configurator::{ConfigRequest, Configurator, RequestId};
use crate::helpers::http_client::HttpClientError;
use super::device::{AuthenticationResult, DeviceError, DeviceFactory, SonyDevice};

/// Behaviour and call log shared by all mock devices of one factory
#[derive(Debug)]
pub struct MockState {
    pub host: String,
    pub nickname: String,
    pub pin: Option<String>,
    pub mac: Option<String>,
    pub power_on: bool,
    pub transport_state: String,
    /// Every device call fails with a transport error
    pub unreachable: bool,
    /// Transport commands fail
    pub fail_commands: bool,
    pub register_result: AuthenticationResult,
    pub register_fails: bool,
    /// PIN submission fails with a transport error
    pub authentication_fails: bool,
    /// PIN accepted by send_authentication
    pub accepted_pin: Option<String>,
    pub auth_mode: u32,
    /// MAC address the device reports while resolving its services
    pub reported_mac: Option<String>,
    pub calls: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            host: String::new(),
            nickname: String::new(),
            pin: None,
            mac: None,
            power_on: true,
            transport_state: "PLAYING".to_string(),
            unreachable: false,
            fail_commands: false,
            register_result: AuthenticationResult::PinNeeded,
            register_fails: false,
            authentication_fails: false,
            accepted_pin: Some("1234".to_string()),
            auth_mode: 4,
            reported_mac: None,
            calls: Vec::new(),
        }
    }
}

fn unreachable_error() -> DeviceError {
    DeviceError::Http(HttpClientError::RequestError("connection refused".to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    pub state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: &str) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.calls.push(call.to_string());
        if state.unreachable {
            return Err(unreachable_error());
        }
        Ok(())
    }

    fn command(&self, call: &str) -> Result<(), DeviceError> {
        self.record(call)?;
        if self.state.lock().fail_commands {
            return Err(DeviceError::Http(HttpClientError::Status(500, "Internal Server Error".to_string())));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl SonyDevice for MockDevice {
    fn host(&self) -> String {
        self.state.lock().host.clone()
    }

    fn nickname(&self) -> String {
        self.state.lock().nickname.clone()
    }

    fn pin(&self) -> Option<String> {
        self.state.lock().pin.clone()
    }

    fn set_pin(&self, pin: Option<String>) {
        self.state.lock().pin = pin;
    }

    fn mac(&self) -> Option<String> {
        self.state.lock().mac.clone()
    }

    fn set_mac(&self, mac: Option<String>) {
        self.state.lock().mac = mac;
    }

    fn update_service_urls(&self) -> Result<(), DeviceError> {
        self.record("update_service_urls")?;
        let mut state = self.state.lock();
        if state.mac.is_none() {
            state.mac = state.reported_mac.clone();
        }
        Ok(())
    }

    fn get_power_status(&self) -> Result<bool, DeviceError> {
        self.record("get_power_status")?;
        Ok(self.state.lock().power_on)
    }

    fn get_playing_status(&self) -> Result<String, DeviceError> {
        self.record("get_playing_status")?;
        Ok(self.state.lock().transport_state.clone())
    }

    fn power(&self, on: bool) -> Result<(), DeviceError> {
        self.command(if on { "power:on" } else { "power:off" })
    }

    fn play(&self) -> Result<(), DeviceError> {
        self.command("play")
    }

    fn pause(&self) -> Result<(), DeviceError> {
        self.command("pause")
    }

    fn next(&self) -> Result<(), DeviceError> {
        self.command("next")
    }

    fn prev(&self) -> Result<(), DeviceError> {
        self.command("prev")
    }

    fn stop(&self) -> Result<(), DeviceError> {
        self.command("stop")
    }

    fn register(&self) -> Result<AuthenticationResult, DeviceError> {
        self.record("register")?;
        let state = self.state.lock();
        if state.register_fails {
            return Err(unreachable_error());
        }
        Ok(state.register_result)
    }

    fn send_authentication(&self, pin: &str) -> Result<bool, DeviceError> {
        self.record(&format!("send_authentication:{}", pin))?;
        let state = self.state.lock();
        if state.authentication_fails {
            return Err(unreachable_error());
        }
        Ok(state.accepted_pin.as_deref() == Some(pin))
    }

    fn get_registration_auth_mode(&self) -> Result<u32, DeviceError> {
        self.record("get_registration_auth_mode")?;
        Ok(self.state.lock().auth_mode)
    }

    fn save_to_json(&self) -> Result<Value, DeviceError> {
        let state = self.state.lock();
        Ok(json!({
            "host": state.host,
            "nickname": state.nickname,
            "pin": state.pin,
            "mac": state.mac,
        }))
    }
}

/// Hands out mock devices that share one state
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    pub device: MockDevice,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<MockState>> {
        self.device.state.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.device.calls()
    }
}

impl DeviceFactory for MockFactory {
    fn create(&self, host: &str, nickname: &str) -> Box<dyn SonyDevice> {
        let mut state = self.device.state.lock();
        state.calls.push(format!("create:{}", host));
        state.host = host.to_string();
        state.nickname = nickname.to_string();
        Box::new(self.device.clone())
    }

    fn load_from_json(&self, device: &Value) -> Result<Box<dyn SonyDevice>, DeviceError> {
        let host = device
            .get("host")
            .and_then(|h| h.as_str())
            .ok_or_else(|| DeviceError::InvalidResponse("stored device without host".to_string()))?;

        let mut state = self.device.state.lock();
        state.calls.push(format!("load_from_json:{}", host));
        state.host = host.to_string();
        state.nickname = device.get("nickname").and_then(|n| n.as_str()).unwrap_or_default().to_string();
        state.pin = device.get("pin").and_then(|p| p.as_str()).map(|p| p.to_string());
        state.mac = device.get("mac").and_then(|m| m.as_str()).map(|m| m.to_string());
        Ok(Box::new(self.device.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Requested(RequestId, ConfigRequest),
    Done(RequestId),
    Error(RequestId, String),
}

/// Prompt host that records every interaction
#[derive(Debug, Default)]
pub struct RecordingConfigurator {
    next_id: AtomicU64,
    events: Mutex<Vec<PromptEvent>>,
}

impl RecordingConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PromptEvent> {
        self.events.lock().clone()
    }

    pub fn requests(&self) -> Vec<ConfigRequest> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PromptEvent::Requested(_, request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(RequestId, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PromptEvent::Error(id, message) => Some((*id, message.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn done(&self) -> Vec<RequestId> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PromptEvent::Done(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl Configurator for RecordingConfigurator {
    fn request_config(&self, request: ConfigRequest) -> RequestId {
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().push(PromptEvent::Requested(request_id, request));
        request_id
    }

    fn request_done(&self, request_id: RequestId) {
        self.events.lock().push(PromptEvent::Done(request_id));
    }

    fn notify_errors(&self, request_id: RequestId, message: &str) {
        self.events.lock().push(PromptEvent::Error(request_id, message.to_string()));
    }
}
