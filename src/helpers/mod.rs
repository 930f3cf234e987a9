pub mod configurator;
pub mod http_client;
pub mod macaddress;
pub mod pairing_store;

pub use configurator::{ConfigField, ConfigRequest, Configurator, ConsoleConfigurator, RequestId};
pub use http_client::{new_http_client, HttpClient, HttpClientError, HttpResponse};
pub use pairing_store::{DeviceRecord, PairingStore, PairingStoreError};
