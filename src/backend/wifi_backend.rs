//! WiFi backend trait definition

use tokio::sync::broadcast;
use trait_variant::make;

use crate::core::error::WifiResult;
use crate::core::types::{LinkEvent, LinkStatus, ProvisioningConfig, ProvisioningMode};

/// Abstraction over the network subsystem (typically wpa_supplicant)
///
/// The supervisor only issues requests through this trait and learns about
/// their outcome from the event stream returned by [`WifiBackend::subscribe`].
#[make(Send)]
pub trait WifiBackend: Send + Sync + 'static {
    /// Register for link events
    ///
    /// Events are delivered in order; the receiver is drained by a single task.
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent>;

    /// Join the previously configured network
    async fn begin_connection(&self) -> WifiResult<()>;

    /// Retry joining after the link was lost
    async fn reconnect(&self) -> WifiResult<()>;

    /// Current raw link status
    async fn link_status(&self) -> WifiResult<LinkStatus>;

    /// SSID of the associated network, if any
    async fn ssid(&self) -> WifiResult<Option<String>>;

    /// Local IPv4 address, if one has been assigned
    async fn local_address(&self) -> WifiResult<Option<String>>;

    /// Switch the radio into client (station) mode
    async fn set_station_mode(&self) -> WifiResult<()>;

    /// Publish the device identity used during WPS
    async fn enable_provisioning(&self, config: &ProvisioningConfig) -> WifiResult<()>;

    /// Start WPS; the outcome arrives as a provisioning event
    async fn start_provisioning(&self, mode: &ProvisioningMode) -> WifiResult<()>;

    /// Leave WPS mode
    async fn disable_provisioning(&self) -> WifiResult<()>;
}
