//! Multi-plan subscription creation errors
//!
//! `create` can fail at several points and each has a different recovery
//! story. Before the remote subscription exists nothing needs undoing; after
//! it exists the caller must either reconcile the orphan or chase the payment.

use super::{Error, ProviderError, ValidationError};
use crate::models::Subscription;

/// Follow-up required on the first payment of a new subscription
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    /// Customer must complete an extra step such as 3-D Secure
    #[error("Payment {intent_id} requires additional action from the customer")]
    ActionRequired {
        intent_id: String,
        client_secret: Option<String>,
    },

    /// Payment method was declined and a new one is needed
    #[error("Payment {intent_id} failed: the payment method was declined")]
    InvalidPaymentMethod { intent_id: String },

    /// Subscription is incomplete but the invoice carried no payment intent
    #[error("Subscription is incomplete and no payment intent was returned")]
    MissingPaymentIntent,
}

/// Errors returned by the multi-plan subscription builder
#[derive(Error, Debug)]
pub enum SubscriptionError {
    /// Request was rejected locally; nothing was sent
    #[error("Invalid subscription request: {0}")]
    Invalid(#[source] ValidationError),

    /// Owner's billing customer could not be found or created; nothing was created
    #[error("Could not resolve billing customer: {source}")]
    CustomerResolution {
        #[source]
        source: Box<Error>,
    },

    /// Provider refused to create the subscription; nothing was created
    #[error("Billing provider rejected the subscription: {source}")]
    RemoteRejected {
        #[source]
        source: ProviderError,
    },

    /// Remote subscription exists but local rows were not written
    #[error("Subscription {stripe_id} exists at the billing provider but was not stored locally: {source}")]
    PartialPersistence {
        stripe_id: String,
        #[source]
        source: Box<Error>,
    },

    /// Subscription was created and stored; the first payment needs attention
    #[error("Subscription {} was created but its payment needs attention: {failure}", subscription.stripe_id)]
    PaymentIncomplete {
        subscription: Box<Subscription>,
        #[source]
        failure: PaymentError,
    },
}

impl SubscriptionError {
    /// Whether a local subscription record exists after this failure
    pub fn was_created(&self) -> bool {
        matches!(self, Self::PaymentIncomplete { .. })
    }

    /// Remote subscription id when the provider side was created
    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::PartialPersistence { stripe_id, .. } => Some(stripe_id),
            Self::PaymentIncomplete { subscription, .. } => Some(&subscription.stripe_id),
            _ => None,
        }
    }

    /// Stored subscription for failures that happen after persistence
    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            Self::PaymentIncomplete { subscription, .. } => Some(subscription),
            _ => None,
        }
    }
}
