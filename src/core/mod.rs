//! Core business logic module

pub mod error;
pub mod events;
pub mod poller;
pub mod provisioning;
pub mod service;
pub mod tracker;
pub mod types;
