use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, info, warn};
use parking_lot::RwLock;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::CLIENTID_PREFIX;
use crate::helpers::http_client::{new_http_client, post_json, HttpClient, HttpClientError};
use crate::helpers::macaddress::{normalize_mac_address, wake_on_lan};
use super::device::{AuthenticationResult, DeviceError, DeviceFactory, SonyDevice};

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Registration mode of devices speaking the JSON API
const JSON_API_AUTH_MODE: u32 = 4;

/// Registration mode assumed when the JSON API is missing
const LEGACY_AUTH_MODE: u32 = 3;

/// Port of the UPnP media renderer
const DMR_PORT: u16 = 52323;

const IRCC_SOAP_ACTION: &str = "\"urn:schemas-sony-com:service:IRCC:1#X_SendIRCC\"";
const AV_TRANSPORT_SOAP_ACTION: &str = "\"urn:schemas-upnp-org:service:AVTransport:1#GetTransportInfo\"";

/// Serialized identity of a Bravia device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BraviaDescriptor {
    pub host: String,
    pub nickname: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    /// Authentication cookie handed out on registration
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub auth_mode: Option<u32>,
    #[serde(default)]
    pub model: Option<String>,
    /// Remote control button name to IRCC code
    #[serde(default)]
    pub ircc_codes: BTreeMap<String, String>,
    #[serde(default)]
    pub av_transport_url: Option<String>,
}

impl BraviaDescriptor {
    pub fn new(host: &str, nickname: &str) -> Self {
        Self {
            host: host.to_string(),
            nickname: nickname.to_string(),
            client_id: format!("{}:{:016x}", CLIENTID_PREFIX, rand::random::<u64>()),
            pin: None,
            mac: None,
            cookie: None,
            auth_mode: None,
            model: None,
            ircc_codes: BTreeMap::new(),
            av_transport_url: None,
        }
    }
}

/// Sony Bravia television controlled over its JSON-RPC, IRCC and UPnP services
#[derive(Debug)]
pub struct BraviaDevice {
    descriptor: RwLock<BraviaDescriptor>,
    client: Arc<dyn HttpClient>,
    request_id: AtomicU32,
}

impl BraviaDevice {
    pub fn new(descriptor: BraviaDescriptor, client: Arc<dyn HttpClient>) -> Self {
        Self {
            descriptor: RwLock::new(descriptor),
            client,
            request_id: AtomicU32::new(1),
        }
    }

    /// Snapshot of the current descriptor
    pub fn descriptor(&self) -> BraviaDescriptor {
        self.descriptor.read().clone()
    }

    fn next_id(&self) -> u32 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.descriptor.read().host)
    }

    fn cookie(&self) -> Option<String> {
        self.descriptor.read().cookie.clone()
    }

    /// Keep only "name=value" of a Set-Cookie header
    fn store_cookie(&self, set_cookie: Option<String>) {
        if let Some(header) = set_cookie {
            let cookie = header.split(';').next().unwrap_or_default().trim().to_string();
            if !cookie.is_empty() {
                debug!("Storing authentication cookie for {}", self.host());
                self.descriptor.write().cookie = Some(cookie);
            }
        }
    }

    /// Call a JSON-RPC method on one of the /sony/<service> endpoints
    fn call(&self, service: &str, method: &str, params: Value) -> Result<Value, DeviceError> {
        let url = format!("{}/sony/{}", self.base_url(), service);
        let payload = json!({
            "method": method,
            "params": params,
            "id": self.next_id(),
            "version": "1.0",
        });
        debug!("Sony RPC {} {} to {}", service, method, url);

        let cookie = self.cookie();
        let headers: Vec<(&str, &str)> = match &cookie {
            Some(c) => vec![("Cookie", c.as_str())],
            None => Vec::new(),
        };

        let (response, _) = post_json(self.client.as_ref(), &url, &payload, &headers)?;
        parse_rpc_result(response)
    }

    /// actRegister call, optionally authenticated with a PIN
    fn act_register(&self, pin: Option<&str>) -> Result<Option<String>, HttpClientError> {
        let (client_id, nickname) = {
            let d = self.descriptor.read();
            (d.client_id.clone(), d.nickname.clone())
        };
        let url = format!("{}/sony/accessControl", self.base_url());
        let payload = json!({
            "method": "actRegister",
            "params": [
                {"clientid": client_id, "nickname": nickname, "level": "private"},
                [{"value": "yes", "function": "WOL"}]
            ],
            "id": self.next_id(),
            "version": "1.0",
        });

        let authorization = pin.map(|p| format!("Basic {}", STANDARD.encode(format!(":{}", p))));
        let headers: Vec<(&str, &str)> = match &authorization {
            Some(auth) => vec![("Authorization", auth.as_str())],
            None => Vec::new(),
        };

        let (response, set_cookie) = post_json(self.client.as_ref(), &url, &payload, &headers)?;
        if let Some(error) = response.get("error") {
            return Err(HttpClientError::ParseError(format!("actRegister failed: {}", error)));
        }
        Ok(set_cookie)
    }

    /// Send a remote control button press
    fn send_ircc(&self, command: &str) -> Result<(), DeviceError> {
        if self.descriptor.read().ircc_codes.is_empty() {
            self.update_service_urls()?;
        }

        let code = self
            .descriptor
            .read()
            .ircc_codes
            .get(command)
            .cloned()
            .ok_or_else(|| DeviceError::UnknownCommand(command.to_string()))?;

        let body = format!(
            concat!(
                "<?xml version=\"1.0\"?>",
                "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" ",
                "s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
                "<s:Body><u:X_SendIRCC xmlns:u=\"urn:schemas-sony-com:service:IRCC:1\">",
                "<IRCCCode>{}</IRCCCode></u:X_SendIRCC></s:Body></s:Envelope>"
            ),
            code
        );

        let url = format!("{}/sony/IRCC", self.base_url());
        let cookie = self.cookie();
        let mut headers = vec![
            ("Content-Type", "text/xml; charset=UTF-8"),
            ("SOAPACTION", IRCC_SOAP_ACTION),
        ];
        if let Some(c) = &cookie {
            headers.push(("Cookie", c.as_str()));
        }

        debug!("Sending IRCC command {} to {}", command, self.host());
        self.client.post_text(&url, &body, &headers)?;
        Ok(())
    }

    fn wake(&self) -> Result<(), DeviceError> {
        let mac_str = match self.mac() {
            Some(mac) => mac,
            None => return Ok(()),
        };
        let mac = normalize_mac_address(&mac_str).map_err(DeviceError::WakeOnLan)?;
        wake_on_lan(&mac).map_err(|e| DeviceError::WakeOnLan(e.to_string()))
    }

    /// MAC address the device reports about itself
    fn query_mac(&self) -> Option<String> {
        match self.call("system", "getSystemInformation", json!([])) {
            Ok(result) => result
                .get(0)
                .and_then(|r| r.get("macAddr"))
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .map(|m| m.to_string()),
            Err(e) => {
                debug!("No system information from {}: {}", self.host(), e);
                None
            }
        }
    }

    fn av_transport_url(&self) -> String {
        let d = self.descriptor.read();
        d.av_transport_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}/upnp/control/AVTransport", d.host, DMR_PORT))
    }

    /// Look up the AVTransport control URL in the renderer description
    fn resolve_av_transport_url(&self) -> Option<String> {
        let host = self.host();
        let description_url = format!("http://{}:{}/dmr.xml", host, DMR_PORT);
        let xml = match self.client.get_text(&description_url) {
            Ok(xml) => xml,
            Err(e) => {
                debug!("No renderer description at {}: {}", description_url, e);
                return None;
            }
        };
        let control_url = find_control_url(&xml, "AVTransport")?;
        if control_url.starts_with("http://") || control_url.starts_with("https://") {
            Some(control_url)
        } else {
            let path = control_url.trim_start_matches('/');
            Some(format!("http://{}:{}/{}", host, DMR_PORT, path))
        }
    }
}

impl SonyDevice for BraviaDevice {
    fn host(&self) -> String {
        self.descriptor.read().host.clone()
    }

    fn nickname(&self) -> String {
        self.descriptor.read().nickname.clone()
    }

    fn pin(&self) -> Option<String> {
        self.descriptor.read().pin.clone()
    }

    fn set_pin(&self, pin: Option<String>) {
        self.descriptor.write().pin = pin;
    }

    fn mac(&self) -> Option<String> {
        self.descriptor.read().mac.clone()
    }

    fn set_mac(&self, mac: Option<String>) {
        self.descriptor.write().mac = mac;
    }

    fn update_service_urls(&self) -> Result<(), DeviceError> {
        let result = self.call("system", "getRemoteControllerInfo", json!([]))?;

        let codes: BTreeMap<String, String> = result
            .get(1)
            .and_then(|list| list.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|entry| {
                        let name = entry.get("name")?.as_str()?;
                        let value = entry.get("value")?.as_str()?;
                        Some((name.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if codes.is_empty() {
            return Err(DeviceError::InvalidResponse("remote controller info without commands".to_string()));
        }
        debug!("Device {} supports {} IRCC commands", self.host(), codes.len());

        let av_transport_url = self.resolve_av_transport_url();
        // needed to wake the device later on
        let mac = match self.mac() {
            Some(_) => None,
            None => self.query_mac(),
        };

        let mut d = self.descriptor.write();
        d.ircc_codes = codes;
        if av_transport_url.is_some() {
            d.av_transport_url = av_transport_url;
        }
        if let Some(mac) = mac {
            debug!("MAC address of {}: {}", d.host, mac);
            d.mac = Some(mac);
        }
        Ok(())
    }

    fn get_power_status(&self) -> Result<bool, DeviceError> {
        let result = self.call("system", "getPowerStatus", json!([]))?;
        let status = result
            .get(0)
            .and_then(|r| r.get("status"))
            .and_then(|s| s.as_str())
            .ok_or_else(|| DeviceError::InvalidResponse(format!("no power status in {}", result)))?;
        debug!("Power status of {}: {}", self.host(), status);
        Ok(status == "active")
    }

    fn get_playing_status(&self) -> Result<String, DeviceError> {
        let body = concat!(
            "<?xml version=\"1.0\"?>",
            "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" ",
            "s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
            "<s:Body><u:GetTransportInfo xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\">",
            "<InstanceID>0</InstanceID></u:GetTransportInfo></s:Body></s:Envelope>"
        );
        let headers = [
            ("Content-Type", "text/xml; charset=\"utf-8\""),
            ("SOAPACTION", AV_TRANSPORT_SOAP_ACTION),
        ];
        let response = self.client.post_text(&self.av_transport_url(), body, &headers)?;
        extract_element_text(&response.body, "CurrentTransportState")
            .ok_or_else(|| DeviceError::InvalidResponse("no CurrentTransportState in response".to_string()))
    }

    fn power(&self, on: bool) -> Result<(), DeviceError> {
        if on {
            if let Err(e) = self.wake() {
                warn!("Could not wake {}: {}", self.host(), e);
            }
        }
        info!("Setting power of {} to {}", self.host(), if on { "on" } else { "off" });
        self.call("system", "setPowerStatus", json!([{"status": on}]))?;
        Ok(())
    }

    fn play(&self) -> Result<(), DeviceError> {
        self.send_ircc("Play")
    }

    fn pause(&self) -> Result<(), DeviceError> {
        self.send_ircc("Pause")
    }

    fn next(&self) -> Result<(), DeviceError> {
        self.send_ircc("Next")
    }

    fn prev(&self) -> Result<(), DeviceError> {
        self.send_ircc("Prev")
    }

    fn stop(&self) -> Result<(), DeviceError> {
        self.send_ircc("Stop")
    }

    fn register(&self) -> Result<AuthenticationResult, DeviceError> {
        match self.act_register(None) {
            Ok(set_cookie) => {
                self.store_cookie(set_cookie);
                Ok(AuthenticationResult::Success)
            }
            Err(HttpClientError::Status(401, _)) => {
                info!("Device {} is showing a PIN", self.host());
                Ok(AuthenticationResult::PinNeeded)
            }
            Err(e @ HttpClientError::RequestError(_)) => Err(e.into()),
            Err(e) => {
                warn!("Registration with {} refused: {}", self.host(), e);
                Ok(AuthenticationResult::Error)
            }
        }
    }

    fn send_authentication(&self, pin: &str) -> Result<bool, DeviceError> {
        match self.act_register(Some(pin)) {
            Ok(set_cookie) => {
                self.store_cookie(set_cookie);
                self.set_pin(Some(pin.to_string()));
                Ok(true)
            }
            Err(e @ HttpClientError::RequestError(_)) => Err(e.into()),
            Err(e) => {
                debug!("PIN rejected by {}: {}", self.host(), e);
                Ok(false)
            }
        }
    }

    fn get_registration_auth_mode(&self) -> Result<u32, DeviceError> {
        if let Some(mode) = self.descriptor.read().auth_mode {
            return Ok(mode);
        }

        let mode = match self.call("system", "getInterfaceInformation", json!([])) {
            Ok(result) => {
                let model = result
                    .get(0)
                    .and_then(|r| r.get("modelName"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string());
                self.descriptor.write().model = model;
                JSON_API_AUTH_MODE
            }
            Err(DeviceError::Protocol { .. }) | Err(DeviceError::Http(HttpClientError::Status(404, _))) => {
                LEGACY_AUTH_MODE
            }
            Err(e) => return Err(e),
        };

        debug!("Registration mode of {}: {}", self.host(), mode);
        self.descriptor.write().auth_mode = Some(mode);
        Ok(mode)
    }

    fn save_to_json(&self) -> Result<Value, DeviceError> {
        Ok(serde_json::to_value(&*self.descriptor.read())?)
    }
}

/// Builds Bravia devices sharing one HTTP client
#[derive(Debug, Clone)]
pub struct BraviaDeviceFactory {
    client: Arc<dyn HttpClient>,
}

impl Default for BraviaDeviceFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

impl BraviaDeviceFactory {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: Arc::from(new_http_client(timeout_secs)),
        }
    }

    /// Use a specific HTTP client implementation
    pub fn with_client(client: Box<dyn HttpClient>) -> Self {
        Self {
            client: Arc::from(client),
        }
    }
}

impl DeviceFactory for BraviaDeviceFactory {
    fn create(&self, host: &str, nickname: &str) -> Box<dyn SonyDevice> {
        Box::new(BraviaDevice::new(BraviaDescriptor::new(host, nickname), self.client.clone()))
    }

    fn load_from_json(&self, device: &Value) -> Result<Box<dyn SonyDevice>, DeviceError> {
        let descriptor: BraviaDescriptor = serde_json::from_value(device.clone())?;
        Ok(Box::new(BraviaDevice::new(descriptor, self.client.clone())))
    }
}

/// Split a JSON-RPC answer into its result or a protocol error
fn parse_rpc_result(response: Value) -> Result<Value, DeviceError> {
    if let Some(error) = response.get("error").and_then(|e| e.as_array()) {
        let code = error.first().and_then(|c| c.as_i64()).unwrap_or(-1);
        let message = error.get(1).and_then(|m| m.as_str()).unwrap_or_default().to_string();
        return Err(DeviceError::Protocol { code, message });
    }
    response
        .get("result")
        .cloned()
        .ok_or_else(|| DeviceError::InvalidResponse(format!("no result in {}", response)))
}

/// Text of the first element with the given local name, ignoring namespaces
fn extract_element_text(xml: &str, element: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == element.as_bytes() => inside = true,
            Ok(Event::Empty(e)) if e.local_name().as_ref() == element.as_bytes() => return Some(String::new()),
            Ok(Event::Text(t)) if inside => {
                return t.unescape().ok().map(|s| s.trim().to_string());
            }
            Ok(Event::End(_)) if inside => return Some(String::new()),
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// controlURL of the first service whose type contains `service`
fn find_control_url(xml: &str, service: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut current: Vec<u8> = Vec::new();
    let mut service_type: Option<String> = None;
    let mut control_url: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = e.local_name().as_ref().to_vec(),
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.trim().to_string(),
                    Err(_) => continue,
                };
                match current.as_slice() {
                    b"serviceType" => service_type = Some(text),
                    b"controlURL" => control_url = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"service" {
                    if service_type.as_deref().is_some_and(|t| t.contains(service)) {
                        if let Some(url) = control_url.take() {
                            return Some(url);
                        }
                    }
                    service_type = None;
                    control_url = None;
                }
                current.clear();
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
