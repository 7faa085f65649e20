//! Error types for the cashier core library
//!
//! Errors are grouped into categories so callers can decide how to react
//! without string matching: provider failures may be retried, validation
//! failures never reach the network, and internal failures point at storage.

use thiserror::Error;

pub mod internal;
pub mod provider;
pub mod subscription;
pub mod validation;

pub use self::provider::ProviderError;
pub use self::subscription::{PaymentError, SubscriptionError};
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cashier core library
#[derive(Error, Debug)]
pub enum Error {
    /// Remote billing provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage and other internal errors
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// Multi-plan subscription creation errors
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

impl Error {
    /// Whether retrying the same operation later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Internal(InternalError::io(source))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(InternalError::database(format!("{err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::io;

    #[test]
    fn test_provider_error_transience_is_exposed() {
        let transient = Error::Provider(ProviderError::api(503, "Service unavailable"));
        let permanent = Error::Provider(ProviderError::api(402, "Card declined"));

        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
    }

    #[test]
    fn test_validation_errors_are_never_transient() {
        let error = Error::Validation(ValidationError::invalid_parameter(
            "chunk_size",
            "must be at least 1",
        ));

        assert!(!error.is_transient());
        assert!(error.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let error: Error = io_error.into();

        assert!(matches!(error, Error::Internal(InternalError::Io { .. })));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_display_formatting() {
        let errors = vec![
            Error::Provider(ProviderError::network("connection reset")),
            Error::Provider(ProviderError::RateLimited { retry_after: Some(2) }),
            Error::Validation(ValidationError::invalid_configuration("missing api key")),
            Error::Internal(InternalError::database("disk I/O error")),
            Error::Subscription(SubscriptionError::Invalid(ValidationError::missing_field(
                "plans",
            ))),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
