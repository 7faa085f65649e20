use cashier_core::{Error as CoreError, ProviderError, SubscriptionError};
use colored::*;
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    source: Option<Box<dyn StdError + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Network,
    Storage,
    PaymentRequired,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    NetworkError = 3,
    StorageError = 4,
    PaymentRequired = 5,
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
}

impl CliError {
    fn new(category: ErrorCategory, message: &str) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    pub fn general(message: &str) -> Self {
        Self::new(ErrorCategory::General, message)
    }

    /// Invalid arguments or configuration values
    pub fn misuse(message: &str) -> Self {
        Self::new(ErrorCategory::Misuse, message)
            .with_suggestion("Run 'cashier --help' for usage information")
    }

    /// Billing provider unreachable or rejecting requests
    pub fn network(message: &str) -> Self {
        Self::new(ErrorCategory::Network, message)
            .with_suggestion("Check your internet connection and Stripe status")
            .with_suggestion("Try again later")
    }

    pub fn storage(message: &str) -> Self {
        Self::new(ErrorCategory::Storage, message)
            .with_suggestion("Check that the database path is writable (cashier config get database.path)")
    }

    /// Subscription exists but its first payment needs customer action
    pub fn payment_required(message: &str) -> Self {
        Self::new(ErrorCategory::PaymentRequired, message)
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Network => ExitCode::NetworkError,
            ErrorCategory::Storage => ExitCode::StorageError,
            ErrorCategory::PaymentRequired => ExitCode::PaymentRequired,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::Storage => "Storage Error",
            ErrorCategory::PaymentRequired => "Payment Required",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse | ErrorCategory::PaymentRequired => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    fn from_core(error: &CoreError) -> Self {
        let message = error.to_string();
        match error {
            CoreError::Validation(_) => Self::misuse(&message),
            CoreError::Provider(provider) => Self::from_provider(provider),
            CoreError::Internal(_) => Self::storage(&message),
            CoreError::Subscription(subscription) => Self::from_subscription(subscription),
        }
    }

    fn from_provider(error: &ProviderError) -> Self {
        let message = error.to_string();
        match error {
            ProviderError::NotConfigured { .. } => Self::general(&message)
                .with_suggestion("Set a secret key: cashier config set stripe.api_key sk_..."),
            ProviderError::Api { status, .. } if *status < 500 => Self::general(&message),
            _ => Self::network(&message),
        }
    }

    /// Classify a failed subscription creation
    pub fn from_subscription(error: &SubscriptionError) -> Self {
        let message = error.to_string();
        let cli_error = match error {
            SubscriptionError::Invalid(_) => Self::misuse(&message),
            SubscriptionError::CustomerResolution { source } => Self::from_core(source)
                .with_context("stage", "customer"),
            SubscriptionError::RemoteRejected { source } => Self::from_provider(source)
                .with_context("stage", "create"),
            SubscriptionError::PartialPersistence { stripe_id, .. } => Self::storage(&message)
                .with_context("stripe subscription", stripe_id)
                .with_suggestion(
                    "The subscription exists in Stripe but not locally; record or cancel it manually",
                ),
            SubscriptionError::PaymentIncomplete { .. } => Self::payment_required(&message),
        };

        Self {
            message,
            ..cli_error
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

/// Classify anyhow errors by the first known error in their chain
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<CliError>() {
            Ok(cli_error) => return cli_error,
            Err(error) => error,
        };

        let message = format!("{error:#}");
        let classified = error.chain().find_map(|cause| {
            if let Some(core) = cause.downcast_ref::<CoreError>() {
                Some(Self::from_core(core))
            } else if let Some(provider) = cause.downcast_ref::<ProviderError>() {
                Some(Self::from_provider(provider))
            } else {
                cause
                    .downcast_ref::<SubscriptionError>()
                    .map(Self::from_subscription)
            }
        });

        let cli_error = classified.unwrap_or_else(|| Self::general(&message));
        Self {
            message,
            source: Some(error.into()),
            ..cli_error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashier_core::error::{InternalError, ValidationError};

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::general("x").exit_code() as i32, 1);
        assert_eq!(CliError::misuse("x").exit_code() as i32, 2);
        assert_eq!(CliError::network("x").exit_code() as i32, 3);
        assert_eq!(CliError::storage("x").exit_code() as i32, 4);
        assert_eq!(CliError::payment_required("x").exit_code() as i32, 5);
    }

    #[test]
    fn test_core_errors_are_classified_through_context() {
        let error = anyhow::Error::new(CoreError::Validation(
            ValidationError::invalid_parameter("chunk_size", "must be positive"),
        ))
        .context("Failed to start reconciliation");
        let cli_error = CliError::from(error);

        assert_eq!(cli_error.exit_code(), ExitCode::Misuse);
        assert!(cli_error.to_string().contains("Failed to start reconciliation"));
        assert!(cli_error.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_storage_and_network_errors() {
        let storage = CliError::from(anyhow::Error::new(CoreError::Internal(
            InternalError::database("locked"),
        )));
        assert_eq!(storage.exit_code(), ExitCode::StorageError);

        let network = CliError::from(anyhow::Error::new(ProviderError::timeout("30s")));
        assert_eq!(network.exit_code(), ExitCode::NetworkError);

        let rejected = CliError::from(anyhow::Error::new(ProviderError::api(400, "bad plan")));
        assert_eq!(rejected.exit_code(), ExitCode::GeneralError);
    }

    #[test]
    fn test_cli_error_passes_through() {
        let error = anyhow::Error::new(CliError::payment_required("confirm pi_1"));
        assert_eq!(CliError::from(error).exit_code(), ExitCode::PaymentRequired);
    }

    #[test]
    fn test_partial_persistence_is_loud() {
        let error = SubscriptionError::PartialPersistence {
            stripe_id: "sub_orphan".to_string(),
            source: Box::new(CoreError::Internal(InternalError::database("disk full"))),
        };
        let cli_error = CliError::from_subscription(&error);

        assert_eq!(cli_error.exit_code(), ExitCode::StorageError);
        let shown = cli_error.format_for_user(false);
        assert!(shown.contains("sub_orphan"));
    }
}
