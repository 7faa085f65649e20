//! Payment confirmation double that records what it was asked

use async_trait::async_trait;
use cashier_core::billing::{IntentStatusValidation, PaymentConfirmation, PaymentIntent};
use cashier_core::PaymentError;
use std::sync::{Arc, Mutex, PoisonError};

/// Delegates to [`IntentStatusValidation`] and records every intent it sees
#[derive(Clone, Default)]
pub struct RecordingPaymentConfirmation {
    seen: Arc<Mutex<Vec<PaymentIntent>>>,
}

impl RecordingPaymentConfirmation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PaymentIntent> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentConfirmation for RecordingPaymentConfirmation {
    async fn validate(&self, intent: &PaymentIntent) -> Result<(), PaymentError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(intent.clone());
        IntentStatusValidation.validate(intent).await
    }
}
