use std::time::Duration;
use log::debug;
use serde_json::Value;
use thiserror::Error;

/// Error types that can occur when interacting with HTTP clients
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request error: {0}")]
    RequestError(String),

    #[error("HTTP status {0}: {1}")]
    Status(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Empty response from server")]
    EmptyResponse,
}

impl HttpClientError {
    /// HTTP status code if the server answered with an error status
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpClientError::Status(code, _) => Some(*code),
            _ => None,
        }
    }
}

/// Body and cookie of a successful response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub body: String,
    /// Value of the Set-Cookie header, if any
    pub set_cookie: Option<String>,
}

/// A trait for HTTP client implementations
/// This version avoids generic methods to enable dynamic dispatch
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    /// Send a POST request with a text body and custom headers
    ///
    /// Non-2xx answers are returned as `HttpClientError::Status`.
    fn post_text(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpClientError>;

    /// Send a GET request and return text response
    fn get_text(&self, url: &str) -> Result<String, HttpClientError>;

    /// Clone the client as a boxed trait object
    fn clone_box(&self) -> Box<dyn HttpClient>;
}

/// Serialize a JSON payload, POST it and parse the JSON answer
pub fn post_json(
    client: &dyn HttpClient,
    url: &str,
    payload: &Value,
    headers: &[(&str, &str)],
) -> Result<(Value, Option<String>), HttpClientError> {
    let json_string = serde_json::to_string(payload)
        .map_err(|e| HttpClientError::ParseError(format!("Failed to serialize JSON payload: {}", e)))?;

    let mut all_headers = vec![("Content-Type", "application/json")];
    all_headers.extend_from_slice(headers);

    let response = client.post_text(url, &json_string, &all_headers)?;
    if response.body.is_empty() {
        return Err(HttpClientError::EmptyResponse);
    }

    match serde_json::from_str::<Value>(&response.body) {
        Ok(json_value) => Ok((json_value, response.set_cookie)),
        Err(e) => {
            debug!("Failed to parse JSON response: {}", e);
            debug!("Response text: {}", response.body);
            Err(HttpClientError::ParseError(e.to_string()))
        }
    }
}

impl Clone for Box<dyn HttpClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An HTTP client implementation using ureq
#[derive(Clone, Debug)]
pub struct UreqHttpClient {
    timeout: Duration,
}

impl Default for UreqHttpClient {
    fn default() -> Self {
        Self::new(5)
    }
}

impl UreqHttpClient {
    /// Create a new HTTP client with the specified timeout
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Hide credentials when logging request headers
fn loggable_header_value(name: &str, value: &str) -> String {
    if name.eq_ignore_ascii_case("Authorization") || name.eq_ignore_ascii_case("Cookie") {
        "[hidden]".to_string()
    } else {
        value.to_string()
    }
}

impl HttpClient for UreqHttpClient {
    fn post_text(&self, url: &str, body: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpClientError> {
        debug!("POST request to {}", url);

        let mut request = ureq::post(url).timeout(self.timeout);
        for &(name, value) in headers {
            debug!("Adding header '{}': '{}'", name, loggable_header_value(name, value));
            request = request.set(name, value);
        }

        let response = match request.send_string(body) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, response)) => {
                let error_body = response
                    .into_string()
                    .unwrap_or_else(|_| "<failed to read response body>".to_string());
                debug!("POST to {} returned HTTP {}", url, code);
                return Err(HttpClientError::Status(code, error_body));
            }
            Err(e) => {
                debug!("POST request failed: {}", e);
                return Err(HttpClientError::RequestError(e.to_string()));
            }
        };

        let set_cookie = response.header("set-cookie").map(|s| s.to_string());

        match response.into_string() {
            Ok(text) => Ok(HttpResponse { body: text, set_cookie }),
            Err(e) => {
                debug!("Failed to read response body: {}", e);
                Err(HttpClientError::ParseError(format!("Failed to read response body: {}", e)))
            }
        }
    }

    fn get_text(&self, url: &str) -> Result<String, HttpClientError> {
        debug!("GET text request to {}", url);

        let response = match ureq::get(url).timeout(self.timeout).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, response)) => {
                let error_body = response.into_string().unwrap_or_default();
                return Err(HttpClientError::Status(code, error_body));
            }
            Err(e) => {
                debug!("GET request failed: {}", e);
                return Err(HttpClientError::RequestError(e.to_string()));
            }
        };

        match response.into_string() {
            Ok(text) => Ok(text),
            Err(e) => {
                debug!("Failed to read response body: {}", e);
                Err(HttpClientError::ParseError(format!("Failed to read response body: {}", e)))
            }
        }
    }

    fn clone_box(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}

/// Create a new HTTP client using the default implementation
pub fn new_http_client(timeout_secs: u64) -> Box<dyn HttpClient> {
    Box::new(UreqHttpClient::new(timeout_secs))
}
