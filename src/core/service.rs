//! Main WiFi link supervisor facade

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    backend::WifiBackend,
    core::{
        error::{ServiceError, ServiceResult},
        events::{EventHandler, RecoveryDelays},
        poller::StatusPoller,
        provisioning::ProvisioningInitiator,
        tracker::ConnectionTracker,
        types::{ConnectionSnapshot, ConnectionState, DeviceIdentity, ProvisioningMode},
    },
};

/// Main WiFi link supervisor facade
///
/// Owns the shared connection tracker and wires it into the event handler,
/// the provisioning initiator and the status poller.
pub struct LinkSupervisor<B: WifiBackend> {
    backend: Arc<B>,
    tracker: Arc<ConnectionTracker>,
    initiator: ProvisioningInitiator<B>,
    poller: Mutex<StatusPoller<B>>,
    delays: RecoveryDelays,
    started: AtomicBool,
}

impl<B: WifiBackend> LinkSupervisor<B> {
    /// Create a new WiFi link supervisor
    pub fn new(
        backend: Arc<B>,
        identity: DeviceIdentity,
        mode: ProvisioningMode,
        delays: RecoveryDelays,
    ) -> Self {
        let tracker = Arc::new(ConnectionTracker::new());
        let initiator =
            ProvisioningInitiator::new(backend.clone(), tracker.clone(), identity, mode);
        let poller = Mutex::new(StatusPoller::new(backend.clone(), tracker.clone()));

        Self {
            backend,
            tracker,
            initiator,
            poller,
            delays,
            started: AtomicBool::new(false),
        }
    }

    /// Subscribe the event handler and issue the initial connection request
    ///
    /// The returned task runs until the backend closes its event channel.
    pub async fn start_connection(&self) -> ServiceResult<JoinHandle<()>> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ServiceError::OperationInProgress);
        }

        // Subscribe before connecting so the first events are not missed
        let handler = EventHandler::new(self.backend.clone(), self.tracker.clone(), self.delays);
        let task = tokio::spawn(handler.run(self.backend.subscribe()));

        if let Err(e) = self.backend.begin_connection().await {
            warn!("Initial connection request failed: {}", e);
            task.abort();
            self.started.store(false, Ordering::Release);
            return Err(e.into());
        }

        info!("Event handler subscribed, connection requested");
        Ok(task)
    }

    /// Trigger WPS push-button provisioning
    pub async fn start_provisioning(&self) -> ServiceResult<()> {
        self.initiator.start().await
    }

    /// Run one status poll, returns true if the raw link status changed
    pub async fn poll_status(&self) -> bool {
        self.poller.lock().await.poll().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.tracker.get()
    }

    pub fn connection_state_label(&self) -> &'static str {
        self.tracker.label()
    }

    /// Observe connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.tracker.subscribe()
    }

    /// Current state plus SSID and address for diagnostics
    pub async fn snapshot(&self) -> ConnectionSnapshot {
        let state = self.tracker.get();
        let (ssid, ip_address) = if state == ConnectionState::Connected {
            (
                self.backend.ssid().await.ok().flatten(),
                self.backend.local_address().await.ok().flatten(),
            )
        } else {
            (None, None)
        };

        ConnectionSnapshot {
            state,
            label: state.label().to_string(),
            ssid,
            ip_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::MockWifiBackend,
        core::types::{LinkEvent, LinkStatus},
    };
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn supervisor(backend: &Arc<MockWifiBackend>) -> LinkSupervisor<MockWifiBackend> {
        LinkSupervisor::new(
            backend.clone(),
            DeviceIdentity::default(),
            ProvisioningMode::PushButton,
            RecoveryDelays::NONE,
        )
    }

    async fn settle() {
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_supervisor_creation() {
        let backend = Arc::new(MockWifiBackend::new());
        let service = supervisor(&backend);

        assert_eq!(service.connection_state(), ConnectionState::Disconnected);
        assert_eq!(service.connection_state_label(), "disc");
        assert_eq!(backend.calls().await.total(), 0);
    }

    #[tokio::test]
    async fn test_start_connection_requests_begin_once() {
        let backend = Arc::new(MockWifiBackend::new());
        let service = supervisor(&backend);

        let task = assert_ok!(service.start_connection().await);
        assert_eq!(backend.calls().await.begin_connection, 1);

        let err = assert_err!(service.start_connection().await);
        assert!(matches!(err, ServiceError::OperationInProgress));
        assert_eq!(backend.calls().await.begin_connection, 1);

        task.abort();
    }

    #[tokio::test]
    async fn test_full_lifecycle_through_events() {
        let backend = Arc::new(MockWifiBackend::new());
        let service = supervisor(&backend);
        let task = service.start_connection().await.unwrap();

        backend.complete_connection("HomeNet", "192.168.1.100").await;
        backend.emit(LinkEvent::InterfaceStarted);
        backend.emit(LinkEvent::AddressAcquired);
        settle().await;
        assert_eq!(service.connection_state(), ConnectionState::Connected);
        assert_eq!(
            service.snapshot().await,
            ConnectionSnapshot {
                state: ConnectionState::Connected,
                label: "conn".into(),
                ssid: Some("HomeNet".into()),
                ip_address: Some("192.168.1.100".into()),
            }
        );

        backend.emit(LinkEvent::LinkLost);
        settle().await;
        assert_eq!(service.connection_state(), ConnectionState::Disconnected);
        assert_eq!(backend.calls().await.reconnect, 1);

        task.abort();
    }

    #[tokio::test]
    async fn test_provisioning_round_trip() {
        let backend = Arc::new(MockWifiBackend::new());
        let service = supervisor(&backend);
        let mut state_rx = service.subscribe_state();
        let task = service.start_connection().await.unwrap();

        service.start_provisioning().await.unwrap();
        assert_eq!(service.connection_state(), ConnectionState::Provisioning);
        assert_eq!(service.connection_state_label(), "WPS");
        assert!(state_rx.has_changed().unwrap());
        assert_eq!(*state_rx.borrow_and_update(), ConnectionState::Provisioning);

        assert!(matches!(
            service.start_provisioning().await,
            Err(ServiceError::OperationInProgress)
        ));

        backend.emit(LinkEvent::ProvisioningTimedOut);
        settle().await;

        assert_eq!(service.connection_state(), ConnectionState::Disconnected);
        let calls = backend.calls().await;
        assert_eq!(calls.start_provisioning, 1);
        assert_eq!(calls.disable_provisioning, 1);
        // initial begin plus the fallback after the timeout
        assert_eq!(calls.begin_connection, 2);

        // outcome handled, a new attempt is accepted
        assert_ok!(service.start_provisioning().await);

        task.abort();
    }

    #[tokio::test]
    async fn test_button_works_again_after_link_comes_up_mid_wps() {
        let backend = Arc::new(MockWifiBackend::new());
        let service = supervisor(&backend);
        let task = service.start_connection().await.unwrap();

        assert_ok!(service.start_provisioning().await);
        backend.emit(LinkEvent::Other("<3>WPS-PBC-ACTIVE".into()));
        backend.emit(LinkEvent::AddressAcquired);
        settle().await;
        assert_eq!(service.connection_state(), ConnectionState::Connected);

        assert_ok!(service.start_provisioning().await);
        assert_eq!(service.connection_state(), ConnectionState::Provisioning);
        assert_eq!(backend.calls().await.start_provisioning, 2);

        task.abort();
    }

    #[tokio::test]
    async fn test_poll_status_reconciles_state() {
        let backend = Arc::new(MockWifiBackend::new());
        let service = supervisor(&backend);

        backend.set_link_status(LinkStatus::Connected).await;
        assert!(service.poll_status().await);
        assert_eq!(service.connection_state(), ConnectionState::Connected);

        assert!(!service.poll_status().await);

        backend.set_link_status(LinkStatus::ConnectionLost).await;
        assert!(service.poll_status().await);
        assert_eq!(service.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_snapshot_omits_details_when_not_connected() {
        let backend = Arc::new(MockWifiBackend::new());
        backend.complete_connection("HomeNet", "192.168.1.100").await;
        let service = supervisor(&backend);

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert_eq!(snapshot.ssid, None);
        assert_eq!(snapshot.ip_address, None);
    }
}
