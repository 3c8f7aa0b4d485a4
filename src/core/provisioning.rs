//! WPS push-button provisioning initiator

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    backend::WifiBackend,
    core::{
        error::{ServiceError, ServiceResult, WifiResult},
        tracker::ConnectionTracker,
        types::{ConnectionState, DeviceIdentity, ProvisioningConfig, ProvisioningMode},
    },
};

/// Starts WPS and leaves the outcome to the event handler
pub struct ProvisioningInitiator<B: WifiBackend> {
    backend: Arc<B>,
    tracker: Arc<ConnectionTracker>,
    identity: DeviceIdentity,
    mode: ProvisioningMode,
}

impl<B: WifiBackend> ProvisioningInitiator<B> {
    pub fn new(
        backend: Arc<B>,
        tracker: Arc<ConnectionTracker>,
        identity: DeviceIdentity,
        mode: ProvisioningMode,
    ) -> Self {
        Self {
            backend,
            tracker,
            identity,
            mode,
        }
    }

    /// Enter provisioning mode
    ///
    /// Returns once WPS has been requested. Success, failure and timeout are
    /// reported later as link events. A second call before the outcome arrived
    /// is rejected with [`ServiceError::OperationInProgress`].
    pub async fn start(&self) -> ServiceResult<()> {
        if !self.tracker.try_begin_provisioning() {
            return Err(ServiceError::OperationInProgress);
        }

        info!("Starting WPS");
        self.tracker.set(ConnectionState::Provisioning);

        let config = ProvisioningConfig::new(self.identity.clone(), self.mode.clone());
        if let Err(e) = self.request(&config).await {
            warn!("WPS request failed: {}", e);
            if let Err(e) = self.backend.disable_provisioning().await {
                warn!("Failed to disable WPS: {}", e);
            }
            self.tracker.set(ConnectionState::Disconnected);
            self.tracker.end_provisioning();
            return Err(e.into());
        }

        info!("WPS requested, waiting for outcome");
        Ok(())
    }

    async fn request(&self, config: &ProvisioningConfig) -> WifiResult<()> {
        self.backend.set_station_mode().await?;
        self.backend.enable_provisioning(config).await?;
        self.backend.start_provisioning(&config.mode).await
    }
}
