//! wifi-ctrl backend implementation

use std::future::Future;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use wifi_ctrl::sta::{Broadcast, BroadcastReceiver, RequestClient, WifiSetup};

use crate::{
    backend::WifiBackend,
    core::{
        error::{WifiError, WifiResult},
        types::{LinkEvent, LinkStatus, ProvisioningConfig, ProvisioningMode},
    },
};

const EVENT_CHANNEL_CAPACITY: usize = 32;
const IP_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(200);
const IP_POLL_RETRIES: usize = 30; // 30 * 200ms = 6 seconds

/// Backend driving a wpa_supplicant instance over its control socket
pub struct WifiCtrlBackend {
    interface: String,
    client: RequestClient,
    events: broadcast::Sender<LinkEvent>,
}

impl WifiCtrlBackend {
    pub async fn new(interface: String, ctrl_dir: &str) -> WifiResult<Self> {
        let path = format!("{}/{}", ctrl_dir.trim_end_matches('/'), interface);
        let mut setup =
            WifiSetup::new().map_err(|e| WifiError::WpaSupplicantError(e.to_string()))?;
        setup.set_socket_path(path);

        let client = setup.get_request_client();
        let broadcast_receiver = setup.get_broadcast_receiver();
        let station = setup.complete();

        // Spawn the station runtime
        tokio::spawn(async move {
            if let Err(e) = station.run().await {
                error!("WifiStation runtime error: {}", e);
            }
        });

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(Self::forward_events(
            interface.clone(),
            broadcast_receiver,
            events.clone(),
        ));

        Ok(Self {
            interface,
            client,
            events,
        })
    }

    /// Translate wpa_supplicant broadcasts into link events
    async fn forward_events(
        interface: String,
        mut receiver: BroadcastReceiver,
        events: broadcast::Sender<LinkEvent>,
    ) {
        // wpa_supplicant reports association only, the DHCP wait runs aside
        let mut address_wait: Option<JoinHandle<()>> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(Broadcast::Ready) => LinkEvent::InterfaceStarted,
                Ok(Broadcast::Connected) => {
                    if let Some(wait) = address_wait.take() {
                        wait.abort();
                    }
                    let interface = interface.clone();
                    let events = events.clone();
                    address_wait = Some(tokio::spawn(async move {
                        let event = wait_for_address(
                            || get_ip_address(&interface),
                            IP_POLL_RETRIES,
                            IP_POLL_INTERVAL,
                        )
                        .await;
                        debug!("Forwarding link event: {:?}", event);
                        let _ = events.send(event);
                    }));
                    continue;
                }
                Ok(Broadcast::Disconnected) => {
                    // A stale address wait must not report the lost association as up
                    if let Some(wait) = address_wait.take() {
                        wait.abort();
                    }
                    LinkEvent::LinkLost
                }
                Ok(Broadcast::Unknown(line)) => event_from_line(&line),
                Ok(other) => LinkEvent::Other(format!("{:?}", other)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("wpa_supplicant broadcast receiver lagged by {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    error!("wpa_supplicant broadcast channel closed");
                    return;
                }
            };

            debug!("Forwarding link event: {:?}", event);
            // No subscriber yet is not an error, the supervisor attaches later
            let _ = events.send(event);
        }
    }

    /// Send a raw control command and check for a FAIL reply
    async fn command(&self, cmd: String) -> WifiResult<String> {
        debug!("wpa_supplicant command: {}", cmd);
        let reply = self
            .client
            .send_custom(cmd.clone())
            .await
            .map_err(|e| WifiError::WpaSupplicantError(format!("{} failed: {}", cmd, e)))?;

        if reply.trim_start().starts_with("FAIL") {
            return Err(WifiError::WpaSupplicantError(format!(
                "{} rejected: {}",
                cmd,
                reply.trim()
            )));
        }

        Ok(reply)
    }

    async fn status_field(&self, key: &str) -> WifiResult<Option<String>> {
        let status =
            self.client.get_status().await.map_err(|e| {
                WifiError::WpaSupplicantError(format!("Failed to get status: {}", e))
            })?;
        Ok(status.get(key).cloned())
    }
}

/// Poll for an address after association
///
/// Yields `AddressAcquired`, or `Other` when DHCP never delivered so the
/// stalled association still shows up in the event log.
async fn wait_for_address<F, Fut>(
    mut lookup: F,
    retries: usize,
    interval: std::time::Duration,
) -> LinkEvent
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<String>>,
{
    for _ in 0..retries {
        if lookup().await.is_some() {
            return LinkEvent::AddressAcquired;
        }
        tokio::time::sleep(interval).await;
    }
    warn!("Associated but no address assigned after {} attempts", retries);
    LinkEvent::Other("associated without address".to_string())
}

/// Map an unparsed wpa_supplicant event line onto a link event
fn event_from_line(line: &str) -> LinkEvent {
    if line.contains("WPS-SUCCESS") {
        LinkEvent::ProvisioningSucceeded
    } else if line.contains("WPS-TIMEOUT") {
        LinkEvent::ProvisioningTimedOut
    } else if line.contains("WPS-FAIL")
        || line.contains("WPS-OVERLAP-DETECTED")
        || line.contains("WPS-CANCEL")
    {
        LinkEvent::ProvisioningFailed
    } else {
        LinkEvent::Other(line.to_string())
    }
}

/// Association alone is not connectivity, COMPLETED also needs an address
fn link_status_from_wpa_state(wpa_state: &str, has_address: bool) -> LinkStatus {
    match wpa_state {
        "COMPLETED" if has_address => LinkStatus::Connected,
        "COMPLETED" => LinkStatus::Idle,
        "DISCONNECTED" => LinkStatus::Disconnected,
        "INTERFACE_DISABLED" => LinkStatus::NoShield,
        "SCANNING" | "INACTIVE" | "ASSOCIATING" | "ASSOCIATED" | "AUTHENTICATING"
        | "4WAY_HANDSHAKE" | "GROUP_HANDSHAKE" => LinkStatus::Idle,
        _ => LinkStatus::Idle,
    }
}

/// Get IP address using ip command
async fn get_ip_address(interface: &str) -> Option<String> {
    let output = Command::new("ip")
        .args(["-4", "addr", "show", interface])
        .output()
        .await
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        let line = line.trim();
        if line.starts_with("inet ") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                let ip = parts[1].split('/').next()?;
                return Some(ip.to_string());
            }
        }
    }

    None
}

impl WifiBackend for WifiCtrlBackend {
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    async fn begin_connection(&self) -> WifiResult<()> {
        self.command("REASSOCIATE".to_string())
            .await
            .map_err(|e| WifiError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn reconnect(&self) -> WifiResult<()> {
        self.command("RECONNECT".to_string())
            .await
            .map_err(|e| WifiError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn link_status(&self) -> WifiResult<LinkStatus> {
        let status =
            self.client.get_status().await.map_err(|e| {
                WifiError::WpaSupplicantError(format!("Failed to get status: {}", e))
            })?;
        let wpa_state = status.get("wpa_state").map(|s| s.as_str()).unwrap_or("UNKNOWN");

        let has_address = wpa_state == "COMPLETED"
            && (status.contains_key("ip_address")
                || get_ip_address(&self.interface).await.is_some());

        Ok(link_status_from_wpa_state(wpa_state, has_address))
    }

    async fn ssid(&self) -> WifiResult<Option<String>> {
        self.status_field("ssid").await
    }

    async fn local_address(&self) -> WifiResult<Option<String>> {
        match self.status_field("ip_address").await? {
            Some(ip) => Ok(Some(ip)),
            None => Ok(get_ip_address(&self.interface).await),
        }
    }

    async fn set_station_mode(&self) -> WifiResult<()> {
        // wpa_supplicant only ever runs the station role on this interface
        debug!("{} already in station mode", self.interface);
        Ok(())
    }

    async fn enable_provisioning(&self, config: &ProvisioningConfig) -> WifiResult<()> {
        let identity = &config.identity;
        for (key, value) in [
            ("manufacturer", identity.manufacturer()),
            ("model_number", identity.model_number()),
            ("model_name", identity.model_name()),
            ("device_name", identity.device_name()),
        ] {
            self.command(format!("SET {} {}", key, value))
                .await
                .map_err(|e| WifiError::ProvisioningFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn start_provisioning(&self, mode: &ProvisioningMode) -> WifiResult<()> {
        let cmd = match mode {
            ProvisioningMode::PushButton => "WPS_PBC".to_string(),
            ProvisioningMode::Pin(pin) => format!("WPS_PIN any {}", pin),
        };
        self.command(cmd)
            .await
            .map_err(|e| WifiError::ProvisioningFailed(e.to_string()))?;
        Ok(())
    }

    async fn disable_provisioning(&self) -> WifiResult<()> {
        self.command("WPS_CANCEL".to_string())
            .await
            .map_err(|e| WifiError::ProvisioningFailed(e.to_string()))?;
        Ok(())
    }
}
