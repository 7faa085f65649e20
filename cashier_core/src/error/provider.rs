//! Billing provider error types

use thiserror::Error;

/// Failures talking to the remote billing provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Connection could not be established or was dropped
    #[error("Network error talking to billing provider: {detail}")]
    Network { detail: String },

    /// Request did not complete in time
    #[error("Billing provider request timed out: {detail}")]
    Timeout { detail: String },

    /// Provider asked us to slow down
    #[error("Rate limited by billing provider (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    /// Provider answered with an error status
    #[error("Billing provider API error: {status} - {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Provider answered with something we could not understand
    #[error("Failed to parse billing provider response: {detail}")]
    Parse { detail: String },

    /// Client is missing credentials or endpoint settings
    #[error("Billing provider is not configured: {message}")]
    NotConfigured { message: String },
}

impl ProviderError {
    /// Create a network error
    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network {
            detail: detail.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::Timeout {
            detail: detail.into(),
        }
    }

    /// Create an API error without a provider error code
    pub fn api(status: u16, message: &str) -> Self {
        Self::Api {
            status,
            code: None,
            message: message.to_string(),
        }
    }

    /// Create a response parse error
    pub fn parse(detail: impl Into<String>) -> Self {
        Self::Parse {
            detail: detail.into(),
        }
    }

    /// Create a not-configured error
    pub fn not_configured(message: &str) -> Self {
        Self::NotConfigured {
            message: message.to_string(),
        }
    }

    /// Check if this error is transient and can be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => matches!(status, 500..=599),
            Self::Parse { .. } | Self::NotConfigured { .. } => false,
        }
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(status, 400..=499),
            Self::NotConfigured { .. } => true,
            _ => false,
        }
    }
}
