//! Connection state tracker

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::core::types::ConnectionState;

/// Holds the current connection state
///
/// Shared between the event handler, the provisioning initiator and the
/// status poller. Reads and writes are atomic, so the event task and the host
/// loop may live on different worker threads.
#[derive(Debug)]
pub struct ConnectionTracker {
    state: watch::Sender<ConnectionState>,
    provisioning: AtomicBool,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            state,
            provisioning: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Store a new state, notifying observers only when it differs
    pub fn set(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    pub fn label(&self) -> &'static str {
        self.get().label()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Claim the provisioning slot, false if an attempt is already running
    pub fn try_begin_provisioning(&self) -> bool {
        self.provisioning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_provisioning(&self) {
        self.provisioning.store(false, Ordering::Release);
    }

    pub fn is_provisioning(&self) -> bool {
        self.provisioning.load(Ordering::Acquire)
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
