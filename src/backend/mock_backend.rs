//! Mock WiFi backend for testing

use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

use crate::backend::WifiBackend;
use crate::core::error::{WifiError, WifiResult};
use crate::core::types::{LinkEvent, LinkStatus, ProvisioningConfig, ProvisioningMode};

/// Number of times each request reached the mock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub begin_connection: usize,
    pub reconnect: usize,
    pub set_station_mode: usize,
    pub enable_provisioning: usize,
    pub start_provisioning: usize,
    pub disable_provisioning: usize,
}

impl CallCounts {
    /// Total number of requests issued
    pub fn total(&self) -> usize {
        self.begin_connection
            + self.reconnect
            + self.set_station_mode
            + self.enable_provisioning
            + self.start_provisioning
            + self.disable_provisioning
    }
}

/// Internal state for the mock backend
#[derive(Debug, Clone)]
struct MockState {
    calls: CallCounts,
    link_status: LinkStatus,
    should_fail_status: bool,
    should_fail_provisioning: bool,
    ssid: Option<String>,
    ip_address: Option<String>,
    last_config: Option<ProvisioningConfig>,
    last_mode: Option<ProvisioningMode>,
}

/// Mock WiFi backend for testing
///
/// Records every request and lets tests inject events and link status.
#[derive(Debug, Clone)]
pub struct MockWifiBackend {
    inner: Arc<Mutex<MockState>>,
    events: broadcast::Sender<LinkEvent>,
}

impl MockWifiBackend {
    /// Create a new mock backend with default state
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(Mutex::new(MockState {
                calls: CallCounts::default(),
                link_status: LinkStatus::Idle,
                should_fail_status: false,
                should_fail_provisioning: false,
                ssid: None,
                ip_address: None,
                last_config: None,
                last_mode: None,
            })),
            events,
        }
    }

    /// Deliver an event to every subscriber
    pub fn emit(&self, event: LinkEvent) {
        let _ = self.events.send(event);
    }

    /// Set the raw status returned by `link_status`
    pub async fn set_link_status(&self, status: LinkStatus) {
        self.inner.lock().await.link_status = status;
    }

    /// Configure mock to fail status reads
    pub async fn set_status_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_status = should_fail;
    }

    /// Configure mock to fail `start_provisioning`
    pub async fn set_provisioning_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_provisioning = should_fail;
    }

    /// Simulate an association with an address
    pub async fn complete_connection(&self, ssid: &str, ip: &str) {
        let mut state = self.inner.lock().await;
        state.link_status = LinkStatus::Connected;
        state.ssid = Some(ssid.to_string());
        state.ip_address = Some(ip.to_string());
    }

    pub async fn calls(&self) -> CallCounts {
        self.inner.lock().await.calls.clone()
    }

    pub async fn last_config(&self) -> Option<ProvisioningConfig> {
        self.inner.lock().await.last_config.clone()
    }

    pub async fn last_mode(&self) -> Option<ProvisioningMode> {
        self.inner.lock().await.last_mode.clone()
    }
}

impl Default for MockWifiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiBackend for MockWifiBackend {
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    async fn begin_connection(&self) -> WifiResult<()> {
        self.inner.lock().await.calls.begin_connection += 1;
        Ok(())
    }

    async fn reconnect(&self) -> WifiResult<()> {
        self.inner.lock().await.calls.reconnect += 1;
        Ok(())
    }

    async fn link_status(&self) -> WifiResult<LinkStatus> {
        let state = self.inner.lock().await;
        if state.should_fail_status {
            Err(WifiError::BackendUnavailable("Mock status failure".into()))
        } else {
            Ok(state.link_status)
        }
    }

    async fn ssid(&self) -> WifiResult<Option<String>> {
        Ok(self.inner.lock().await.ssid.clone())
    }

    async fn local_address(&self) -> WifiResult<Option<String>> {
        Ok(self.inner.lock().await.ip_address.clone())
    }

    async fn set_station_mode(&self) -> WifiResult<()> {
        self.inner.lock().await.calls.set_station_mode += 1;
        Ok(())
    }

    async fn enable_provisioning(&self, config: &ProvisioningConfig) -> WifiResult<()> {
        let mut state = self.inner.lock().await;
        state.calls.enable_provisioning += 1;
        state.last_config = Some(config.clone());
        Ok(())
    }

    async fn start_provisioning(&self, mode: &ProvisioningMode) -> WifiResult<()> {
        let mut state = self.inner.lock().await;
        state.calls.start_provisioning += 1;
        if state.should_fail_provisioning {
            return Err(WifiError::ProvisioningFailed("Mock WPS failure".into()));
        }
        state.last_mode = Some(mode.clone());
        Ok(())
    }

    async fn disable_provisioning(&self) -> WifiResult<()> {
        self.inner.lock().await.calls.disable_provisioning += 1;
        Ok(())
    }
}
