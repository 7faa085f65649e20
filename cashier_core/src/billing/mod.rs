//! Billing provider integration and multi-plan subscriptions

pub mod builder;
pub mod http;
pub mod payload;
pub mod payment;
pub mod provider;
pub mod stripe;

pub use builder::{BillingServices, MultiPlanBuilder};
pub use payload::{EXPAND_PAYMENT_INTENT, PlanItem, SubscriptionPayload, TrialEnd};
pub use payment::{IntentStatusValidation, PaymentConfirmation, PaymentIntent, PaymentIntentStatus};
pub use provider::{
    BillingProvider, CustomerOptions, ProviderResult, RemoteInvoice, RemoteSubscription,
    RemoteSubscriptionItem,
};
pub use stripe::{StripeClient, StripeConfig};
