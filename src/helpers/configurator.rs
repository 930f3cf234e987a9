//! Interactive configuration requests (the prompt subsystem)
//!
//! A host shows a form to the operator for every request and later feeds the
//! submitted values back to whoever opened the request.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Handle of an open configuration request
pub type RequestId = u64;

/// A single input field of a configuration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

impl ConfigField {
    /// Plain text input
    pub fn text(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            field_type: String::new(),
        }
    }
}

/// Form shown to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_image: Option<String>,
    pub submit_caption: String,
    pub fields: Vec<ConfigField>,
}

/// Host-provided prompt mechanism
///
/// Submissions arrive later through the requester's own API.
pub trait Configurator: Send + Sync {
    /// Show a form and return a handle for it
    fn request_config(&self, request: ConfigRequest) -> RequestId;

    /// Close a form after the flow completed
    fn request_done(&self, request_id: RequestId);

    /// Show an error message on an open form
    fn notify_errors(&self, request_id: RequestId, message: &str);
}

/// Configurator for terminal hosts
///
/// Forms are printed to stderr; the host reads the answers itself.
#[derive(Debug, Default)]
pub struct ConsoleConfigurator {
    next_id: AtomicU64,
    open: Mutex<Vec<RequestId>>,
}

impl ConsoleConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a request is still open
    pub fn is_open(&self, request_id: RequestId) -> bool {
        self.open.lock().contains(&request_id)
    }
}

impl Configurator for ConsoleConfigurator {
    fn request_config(&self, request: ConfigRequest) -> RequestId {
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.open.lock().push(request_id);

        info!("Configuration request {} opened for {}", request_id, request.name);
        eprintln!();
        eprintln!("== {} ==", request.name);
        eprintln!("{}", request.description);
        for field in &request.fields {
            eprintln!("  [{}] {}", field.id, field.name);
        }
        request_id
    }

    fn request_done(&self, request_id: RequestId) {
        self.open.lock().retain(|id| *id != request_id);
        info!("Configuration request {} done", request_id);
        eprintln!("Configuration complete.");
    }

    fn notify_errors(&self, request_id: RequestId, message: &str) {
        error!("Configuration request {}: {}", request_id, message);
        eprintln!("Error: {}", message);
    }
}
