// Pairing store
// Keeps one record per paired television in a small JSON file, keyed by host.
// The device blob is produced and consumed by the device client; the store
// never looks inside it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PairingStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PairingStoreError>;

/// Persisted state of a paired device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Serialized device identity, needed to skip pairing and to wake the device
    pub device: Value,
}

impl DeviceRecord {
    pub fn new(device: Value) -> Self {
        Self { device }
    }
}

/// File backed map from host address to device record
#[derive(Debug, Clone)]
pub struct PairingStore {
    file_path: PathBuf,
}

impl PairingStore {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load all records; a missing or empty file holds no records
    pub fn load(&self) -> Result<BTreeMap<String, DeviceRecord>> {
        if !self.file_path.exists() {
            debug!("Pairing file {} does not exist yet", self.file_path.display());
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.file_path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Record for a single host
    pub fn get(&self, host: &str) -> Result<Option<DeviceRecord>> {
        Ok(self.load()?.remove(host))
    }

    /// Insert or replace the record of a host, keeping all other hosts
    pub fn save(&self, host: &str, record: DeviceRecord) -> Result<()> {
        let mut records = self.load()?;
        records.insert(host.to_string(), record);
        self.write(&records)?;
        info!("Saved pairing record for {} to {}", host, self.file_path.display());
        Ok(())
    }

    /// Forget a host; returns whether a record existed
    pub fn remove(&self, host: &str) -> Result<bool> {
        let mut records = self.load()?;
        let existed = records.remove(host).is_some();
        if existed {
            self.write(&records)?;
            info!("Removed pairing record for {}", host);
        }
        Ok(existed)
    }

    fn write(&self, records: &BTreeMap<String, DeviceRecord>) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.file_path, json)?;
        Ok(())
    }
}
