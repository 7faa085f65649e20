//! Payment follow-up for incomplete subscriptions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Status of a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    /// Older API versions report 3-D Secure this way
    RequiresSourceAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// First-payment intent attached to a subscription's latest invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl PaymentIntent {
    /// Build an intent from a raw status string
    pub fn new(id: &str, status: &str) -> Self {
        let status = serde_json::from_value(serde_json::Value::String(status.to_string()))
            .unwrap_or(PaymentIntentStatus::Unknown);
        Self {
            id: id.to_string(),
            status,
            client_secret: None,
        }
    }

    pub fn with_client_secret(mut self, secret: &str) -> Self {
        self.client_secret = Some(secret.to_string());
        self
    }

    pub fn requires_payment_method(&self) -> bool {
        self.status == PaymentIntentStatus::RequiresPaymentMethod
    }

    pub fn requires_action(&self) -> bool {
        matches!(
            self.status,
            PaymentIntentStatus::RequiresAction | PaymentIntentStatus::RequiresSourceAction
        )
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentIntentStatus::Succeeded
    }
}

/// Decides whether a new subscription's first payment went through
#[async_trait]
pub trait PaymentConfirmation: Send + Sync {
    async fn validate(&self, intent: &PaymentIntent) -> Result<(), PaymentError>;
}

/// Judges the payment by the intent status alone
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentStatusValidation;

#[async_trait]
impl PaymentConfirmation for IntentStatusValidation {
    async fn validate(&self, intent: &PaymentIntent) -> Result<(), PaymentError> {
        if intent.requires_payment_method() {
            return Err(PaymentError::InvalidPaymentMethod {
                intent_id: intent.id.clone(),
            });
        }

        if intent.requires_action() {
            return Err(PaymentError::ActionRequired {
                intent_id: intent.id.clone(),
                client_secret: intent.client_secret.clone(),
            });
        }

        Ok(())
    }
}
