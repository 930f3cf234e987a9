/// Display name used when the configuration does not set one
pub const DEFAULT_NAME: &str = "Sony Media Player";

/// Default file holding the pairing records
pub const SONY_CONFIG_FILE: &str = "sony.conf";

/// Default configuration file of the command line host
pub const DEFAULT_CONFIG_FILE: &str = "sonycontrol.json";

/// Prefix of the client id announced during registration
pub const CLIENTID_PREFIX: &str = "HomeAssistant";

/// PIN that asks the device to show a PIN on screen
pub const PIN_REQUEST: &str = "0000";

/// Shown on the open prompt when a registration attempt fails
pub const REGISTRATION_RETRY_MESSAGE: &str = "Failed to register, please try again.";

pub const PIN_DESCRIPTION: &str =
    "Enter the Pin shown on your Sony Device. If no Pin is shown, enter 0000 to let the device show you a Pin.";

pub const PIN_DESCRIPTION_IMAGE: &str = "/static/images/smart-tv.png";

pub const PIN_FIELD_ID: &str = "pin";

pub const PIN_FIELD_NAME: &str = "Enter the pin";

pub const PIN_SUBMIT_CAPTION: &str = "Confirm";
