//! Billing provider capability
//!
//! Everything the billing flows need from the remote provider, expressed as
//! one async trait so the live HTTP client and test doubles are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::payload::SubscriptionPayload;
use super::payment::PaymentIntent;
use crate::error::ProviderError;
use crate::models::SubscriptionStatus;

/// Result type for remote provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Attributes for a newly created remote customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerOptions {
    pub email: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CustomerOptions {
    /// Form parameters, skipping absent fields
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::new();
        if let Some(email) = &self.email {
            form.push(("email".to_string(), email.clone()));
        }
        if let Some(name) = &self.name {
            form.push(("name".to_string(), name.clone()));
        }
        if let Some(description) = &self.description {
            form.push(("description".to_string(), description.clone()));
        }
        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

/// Subscription as returned by the provider on creation
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    /// Items in the order the provider returned them
    pub items: Vec<RemoteSubscriptionItem>,
    pub latest_invoice: Option<RemoteInvoice>,
}

impl RemoteSubscription {
    /// Payment intent of the latest invoice, when it was expanded
    pub fn payment_intent(&self) -> Option<&PaymentIntent> {
        self.latest_invoice
            .as_ref()
            .and_then(|invoice| invoice.payment_intent.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSubscriptionItem {
    pub id: String,
    pub plan: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteInvoice {
    pub id: String,
    pub payment_intent: Option<PaymentIntent>,
}

/// Remote billing operations
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a customer and return its remote id
    async fn create_customer(&self, options: &CustomerOptions) -> ProviderResult<String>;

    /// Attach a payment method and make it the customer's invoice default
    async fn update_default_payment_method(
        &self,
        customer_id: &str,
        payment_method: &str,
    ) -> ProviderResult<()>;

    /// Create a subscription for a customer
    async fn create_subscription(
        &self,
        customer_id: &str,
        payload: &SubscriptionPayload,
    ) -> ProviderResult<RemoteSubscription>;

    /// Current status of a subscription
    async fn fetch_subscription_status(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<SubscriptionStatus>;
}
