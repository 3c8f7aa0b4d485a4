//! Link status poller

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    backend::WifiBackend,
    core::{
        tracker::ConnectionTracker,
        types::{ConnectionState, LinkStatus},
    },
};

/// Cross-checks the tracked state against the backend's raw link status
///
/// Catches status changes that some backends never report as events.
pub struct StatusPoller<B: WifiBackend> {
    backend: Arc<B>,
    tracker: Arc<ConnectionTracker>,
    last: Option<LinkStatus>,
}

impl<B: WifiBackend> StatusPoller<B> {
    pub fn new(backend: Arc<B>, tracker: Arc<ConnectionTracker>) -> Self {
        Self {
            backend,
            tracker,
            last: None,
        }
    }

    /// Sample the link once, returns true if the raw status changed
    pub async fn poll(&mut self) -> bool {
        let now = match self.backend.link_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to read link status: {}", e);
                return false;
            }
        };

        if self.last == Some(now) {
            return false;
        }

        info!("WiFi status changed from: {:?} to: {:?}", self.last, now);
        self.tracker.set(if now.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        });
        self.last = Some(now);
        true
    }

    pub fn last_status(&self) -> Option<LinkStatus> {
        self.last
    }
}
