//! Error types for the WiFi link supervisor

use thiserror::Error;

/// Result type for WiFi backend operations
pub type WifiResult<T> = Result<T, WifiError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors related to WiFi backend operations
#[derive(Error, Debug, Clone)]
pub enum WifiError {
    #[error("Connection request failed: {0}")]
    ConnectionFailed(String),

    #[error("Provisioning request failed: {0}")]
    ProvisioningFailed(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid {field}: expected 1..={max} bytes, got {actual}")]
    InvalidIdentity {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Invalid WPS PIN: expected 4 or 8 digits, got {0} characters")]
    InvalidPin(usize),

    #[error("wpa_supplicant error: {0}")]
    WpaSupplicantError(String),
}

/// Errors related to core service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Operation already in progress")]
    OperationInProgress,

    #[error("Backend error: {0}")]
    Backend(#[from] WifiError),
}
