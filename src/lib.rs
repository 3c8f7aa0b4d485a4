//! WiFi Link Supervisor
//!
//! Keeps a wireless client connected:
//! - tracks the connection state from link events
//! - drives WPS push-button provisioning
//! - reconnects after link loss and polls the raw link status as a safety net

pub mod backend;
pub mod config;
pub mod core;

pub use core::{
    error::{ServiceError, WifiError},
    service::LinkSupervisor,
    types::{ConnectionSnapshot, ConnectionState, LinkEvent, LinkStatus},
};
