//! Domain types for the WiFi link supervisor

use serde::{Deserialize, Serialize};

use super::error::{WifiError, WifiResult};

/// Connection lifecycle states
///
/// `Failed` is reserved: no transition in this crate sets it. Sustained
/// inability to connect shows up as repeated Disconnected/reconnect cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Provisioning,
    Connected,
    Failed,
}

impl ConnectionState {
    /// Short diagnostic label
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disc",
            ConnectionState::Provisioning => "WPS",
            ConnectionState::Connected => "conn",
            ConnectionState::Failed => "fail",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw link status as reported by the network subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    NoShield,
    Idle,
    NoSsidAvailable,
    ScanCompleted,
    Connected,
    ConnectFailed,
    ConnectionLost,
    Disconnected,
}

impl LinkStatus {
    /// Only `Connected` means the link is fully usable
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkStatus::Connected)
    }
}

/// Notifications delivered by the network subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    InterfaceStarted,
    AddressAcquired,
    LinkLost,
    ProvisioningSucceeded,
    ProvisioningFailed,
    ProvisioningTimedOut,
    /// Anything the supervisor does not act on, raw text kept for diagnostics
    Other(String),
}

const MANUFACTURER_MAX_LEN: usize = 64;
const MODEL_NUMBER_MAX_LEN: usize = 32;
const MODEL_NAME_MAX_LEN: usize = 32;
const DEVICE_NAME_MAX_LEN: usize = 32;

/// Device identity advertised during WPS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityFields")]
pub struct DeviceIdentity {
    manufacturer: String,
    model_number: String,
    model_name: String,
    device_name: String,
}

impl DeviceIdentity {
    /// Build an identity, rejecting empty or oversized fields
    pub fn new(
        manufacturer: impl Into<String>,
        model_number: impl Into<String>,
        model_name: impl Into<String>,
        device_name: impl Into<String>,
    ) -> WifiResult<Self> {
        Ok(Self {
            manufacturer: bounded("manufacturer", manufacturer.into(), MANUFACTURER_MAX_LEN)?,
            model_number: bounded("model_number", model_number.into(), MODEL_NUMBER_MAX_LEN)?,
            model_name: bounded("model_name", model_name.into(), MODEL_NAME_MAX_LEN)?,
            device_name: bounded("device_name", device_name.into(), DEVICE_NAME_MAX_LEN)?,
        })
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn model_number(&self) -> &str {
        &self.model_number
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            manufacturer: "ESPRESSIF".to_string(),
            model_number: "ESP32".to_string(),
            model_name: "ESPRESSIF IOT".to_string(),
            device_name: "ESP STATION".to_string(),
        }
    }
}

/// Unchecked wire form, deserialized identities go through `DeviceIdentity::new`
#[derive(Deserialize)]
struct IdentityFields {
    manufacturer: String,
    model_number: String,
    model_name: String,
    device_name: String,
}

impl TryFrom<IdentityFields> for DeviceIdentity {
    type Error = WifiError;

    fn try_from(fields: IdentityFields) -> WifiResult<Self> {
        DeviceIdentity::new(
            fields.manufacturer,
            fields.model_number,
            fields.model_name,
            fields.device_name,
        )
    }
}

fn bounded(field: &'static str, value: String, max: usize) -> WifiResult<String> {
    if value.is_empty() || value.len() > max {
        return Err(WifiError::InvalidIdentity {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(value)
}

/// WPS method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningMode {
    #[default]
    PushButton,
    Pin(String),
}

impl ProvisioningMode {
    /// PIN mode; the PIN must be 4 or 8 ASCII digits
    pub fn pin(pin: impl Into<String>) -> WifiResult<Self> {
        let pin = pin.into();
        if !matches!(pin.len(), 4 | 8) || !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WifiError::InvalidPin(pin.len()));
        }
        Ok(ProvisioningMode::Pin(pin))
    }
}

/// Configuration for a single provisioning attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    pub identity: DeviceIdentity,
    pub mode: ProvisioningMode,
}

impl ProvisioningConfig {
    pub fn new(identity: DeviceIdentity, mode: ProvisioningMode) -> Self {
        Self { identity, mode }
    }
}

/// Point-in-time view of the supervised link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}
