//! Cashier Core Library
//!
//! Multi-plan subscriptions on top of the Stripe billing API, plus a job that
//! reconciles locally stored subscription statuses with the provider.

pub mod billing;
#[cfg(feature = "database")]
pub mod database;
pub mod error;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod security;
pub mod store;

pub use billing::{
    BillingProvider, BillingServices, CustomerOptions, IntentStatusValidation, MultiPlanBuilder,
    PaymentConfirmation, PaymentIntent, StripeClient, StripeConfig,
};
#[cfg(feature = "database")]
pub use database::Database;
pub use error::{Error, PaymentError, ProviderError, Result, SubscriptionError};
pub use models::{Customer, Subscription, SubscriptionItem, SubscriptionStatus};
pub use progress::{NullProvider, ProgressProvider, ProgressUpdate};
pub use reconcile::{ReconcileOptions, ReconcileSummary, RecordOutcome, StatusReconciler};
pub use security::SecretKey;
pub use store::{CustomerStore, SubscriptionStore};
