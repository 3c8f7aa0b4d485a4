//! Link event handler
//!
//! Consumes the backend's event stream one event at a time and drives the
//! connection state plus the recovery requests that follow each event.

use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    backend::WifiBackend,
    core::{
        tracker::ConnectionTracker,
        types::{ConnectionState, LinkEvent},
    },
};

/// Pauses inserted before recovery requests so the stack can settle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryDelays {
    pub link_lost: Duration,
    pub provisioning_succeeded: Duration,
    pub provisioning_failed: Duration,
}

impl RecoveryDelays {
    pub const NONE: Self = Self {
        link_lost: Duration::ZERO,
        provisioning_succeeded: Duration::ZERO,
        provisioning_failed: Duration::ZERO,
    };
}

impl Default for RecoveryDelays {
    fn default() -> Self {
        Self {
            link_lost: Duration::from_millis(10),
            provisioning_succeeded: Duration::from_millis(100),
            provisioning_failed: Duration::from_millis(10),
        }
    }
}

/// Reacts to link events from the backend
pub struct EventHandler<B: WifiBackend> {
    backend: Arc<B>,
    tracker: Arc<ConnectionTracker>,
    delays: RecoveryDelays,
}

impl<B: WifiBackend> EventHandler<B> {
    pub fn new(backend: Arc<B>, tracker: Arc<ConnectionTracker>, delays: RecoveryDelays) -> Self {
        Self {
            backend,
            tracker,
            delays,
        }
    }

    /// Drain the subscription until the backend closes it
    pub async fn run(self, mut events: broadcast::Receiver<LinkEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event handler lagged, {} link events dropped", n);
                    // A dropped WPS outcome must not block the next button press
                    self.tracker.end_provisioning();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    error!("Link event channel closed, stopping event handler");
                    return;
                }
            }
        }
    }

    /// Apply a single event
    pub async fn handle(&self, event: LinkEvent) {
        match event {
            LinkEvent::InterfaceStarted => {
                info!("Station mode started");
                self.tracker.set(ConnectionState::Disconnected);
            }
            LinkEvent::AddressAcquired => {
                let ssid = self.backend.ssid().await.ok().flatten();
                let ip = self.backend.local_address().await.ok().flatten();
                info!(
                    "Connected to: {}, got IP: {}",
                    ssid.as_deref().unwrap_or("<unknown>"),
                    ip.as_deref().unwrap_or("<unknown>")
                );
                self.tracker.end_provisioning();
                self.tracker.set(ConnectionState::Connected);
            }
            LinkEvent::LinkLost => {
                info!("Disconnected from station, attempting reconnection");
                self.tracker.set(ConnectionState::Disconnected);
                tokio::time::sleep(self.delays.link_lost).await;
                if let Err(e) = self.backend.reconnect().await {
                    warn!("Reconnect request failed: {}", e);
                }
            }
            LinkEvent::ProvisioningSucceeded => {
                let ssid = self.backend.ssid().await.ok().flatten();
                info!(
                    "WPS successful, stopping WPS and connecting to: {}",
                    ssid.as_deref().unwrap_or("<unknown>")
                );
                self.fall_back_to_connect(self.delays.provisioning_succeeded)
                    .await;
            }
            LinkEvent::ProvisioningFailed => {
                info!("WPS failed, retrying normal connect");
                self.fall_back_to_connect(self.delays.provisioning_failed)
                    .await;
            }
            LinkEvent::ProvisioningTimedOut => {
                info!("WPS timed out, trying normal connect");
                self.fall_back_to_connect(self.delays.provisioning_failed)
                    .await;
            }
            LinkEvent::Other(raw) => {
                debug!("Ignoring link event: {}", raw);
            }
        }
    }

    /// Every provisioning outcome ends with a normal connection attempt
    async fn fall_back_to_connect(&self, pause: Duration) {
        if let Err(e) = self.backend.disable_provisioning().await {
            warn!("Failed to disable WPS: {}", e);
        }
        self.tracker.end_provisioning();
        self.tracker.set(ConnectionState::Disconnected);
        tokio::time::sleep(pause).await;
        if let Err(e) = self.backend.begin_connection().await {
            warn!("Connection request failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockWifiBackend, mock_backend::CallCounts};
    use pretty_assertions::assert_eq;

    fn setup(
        backend: &Arc<MockWifiBackend>,
    ) -> (EventHandler<MockWifiBackend>, Arc<ConnectionTracker>) {
        let tracker = Arc::new(ConnectionTracker::new());
        let handler = EventHandler::new(backend.clone(), tracker.clone(), RecoveryDelays::NONE);
        (handler, tracker)
    }

    #[tokio::test]
    async fn test_started_then_address_acquired_connects() {
        let backend = Arc::new(MockWifiBackend::new());
        backend.complete_connection("HomeNet", "192.168.1.100").await;
        let (handler, tracker) = setup(&backend);

        handler.handle(LinkEvent::InterfaceStarted).await;
        assert_eq!(tracker.get(), ConnectionState::Disconnected);

        handler.handle(LinkEvent::AddressAcquired).await;
        assert_eq!(tracker.get(), ConnectionState::Connected);
        assert_eq!(backend.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn test_link_lost_requests_single_reconnect() {
        let backend = Arc::new(MockWifiBackend::new());
        let (handler, tracker) = setup(&backend);

        handler.handle(LinkEvent::AddressAcquired).await;
        handler.handle(LinkEvent::LinkLost).await;

        assert_eq!(tracker.get(), ConnectionState::Disconnected);
        assert_eq!(
            backend.calls().await,
            CallCounts {
                reconnect: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_provisioning_outcomes_fall_back_to_connect() {
        for event in [
            LinkEvent::ProvisioningSucceeded,
            LinkEvent::ProvisioningFailed,
            LinkEvent::ProvisioningTimedOut,
        ] {
            let backend = Arc::new(MockWifiBackend::new());
            let (handler, tracker) = setup(&backend);
            tracker.set(ConnectionState::Provisioning);
            assert!(tracker.try_begin_provisioning());

            handler.handle(event.clone()).await;

            assert_eq!(tracker.get(), ConnectionState::Disconnected, "{:?}", event);
            assert!(!tracker.is_provisioning());
            assert_eq!(
                backend.calls().await,
                CallCounts {
                    disable_provisioning: 1,
                    begin_connection: 1,
                    ..Default::default()
                },
                "{:?}",
                event
            );
        }
    }

    #[tokio::test]
    async fn test_unrecognized_event_is_ignored() {
        let backend = Arc::new(MockWifiBackend::new());
        let (handler, tracker) = setup(&backend);

        for state in [ConnectionState::Connected, ConnectionState::Provisioning] {
            tracker.set(state);
            handler
                .handle(LinkEvent::Other("CTRL-EVENT-SCAN-RESULTS".into()))
                .await;
            assert_eq!(tracker.get(), state);
        }
        assert_eq!(backend.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn test_connect_lose_then_provisioning_failure_scenario() {
        let backend = Arc::new(MockWifiBackend::new());
        let (handler, tracker) = setup(&backend);
        assert_eq!(tracker.get(), ConnectionState::Disconnected);

        handler.handle(LinkEvent::AddressAcquired).await;
        assert_eq!(tracker.get(), ConnectionState::Connected);

        handler.handle(LinkEvent::LinkLost).await;
        assert_eq!(tracker.get(), ConnectionState::Disconnected);
        assert_eq!(backend.calls().await.reconnect, 1);

        handler.handle(LinkEvent::ProvisioningFailed).await;
        assert_eq!(tracker.get(), ConnectionState::Disconnected);
        let calls = backend.calls().await;
        assert_eq!(calls.disable_provisioning, 1);
        assert_eq!(calls.begin_connection, 1);
        assert_eq!(calls.reconnect, 1);
    }

    #[tokio::test]
    async fn test_run_processes_subscription_in_order() {
        let backend = Arc::new(MockWifiBackend::new());
        let (handler, tracker) = setup(&backend);
        let task = tokio::spawn(handler.run(backend.subscribe()));

        backend.emit(LinkEvent::InterfaceStarted);
        backend.emit(LinkEvent::AddressAcquired);
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert_eq!(tracker.get(), ConnectionState::Connected);

        backend.emit(LinkEvent::LinkLost);
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert_eq!(tracker.get(), ConnectionState::Disconnected);
        assert_eq!(backend.calls().await.reconnect, 1);

        task.abort();
    }

    #[tokio::test]
    async fn test_address_acquired_releases_provisioning_slot() {
        let backend = Arc::new(MockWifiBackend::new());
        let (handler, tracker) = setup(&backend);
        assert!(tracker.try_begin_provisioning());
        tracker.set(ConnectionState::Provisioning);

        handler
            .handle(LinkEvent::Other("<3>WPS-PBC-ACTIVE".into()))
            .await;
        assert!(tracker.is_provisioning());

        handler.handle(LinkEvent::AddressAcquired).await;
        assert_eq!(tracker.get(), ConnectionState::Connected);
        assert!(!tracker.is_provisioning());
        assert_eq!(backend.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscription_releases_provisioning_slot() {
        let backend = Arc::new(MockWifiBackend::new());
        let (handler, tracker) = setup(&backend);
        assert!(tracker.try_begin_provisioning());
        let events = backend.subscribe();

        // Overflow the channel before the handler gets to run
        for i in 0..64 {
            backend.emit(LinkEvent::Other(format!("noise {}", i)));
        }
        let task = tokio::spawn(handler.run(events));
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;

        assert!(!tracker.is_provisioning());
        assert_eq!(backend.calls().await.total(), 0);

        task.abort();
    }
}
