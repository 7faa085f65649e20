//! Fixture builders for billing records

use cashier_core::models::time_utils;
use cashier_core::{Customer, Subscription, SubscriptionStatus};

/// Builder for subscription fixtures
pub struct SubscriptionFixture {
    customer_id: i64,
    name: String,
    stripe_id: String,
    status: SubscriptionStatus,
    trial_ends_at: Option<i64>,
    ends_at: Option<i64>,
}

impl SubscriptionFixture {
    /// Unsynced multi-plan subscription with the given remote id
    pub fn new(stripe_id: &str) -> Self {
        Self {
            customer_id: 1,
            name: "default".to_string(),
            stripe_id: stripe_id.to_string(),
            status: SubscriptionStatus::Unsynced,
            trial_ends_at: None,
            ends_at: None,
        }
    }

    pub fn for_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn trial_ends_at(mut self, millis: i64) -> Self {
        self.trial_ends_at = Some(millis);
        self
    }

    pub fn ends_at(mut self, millis: i64) -> Self {
        self.ends_at = Some(millis);
        self
    }

    pub fn build(self) -> Subscription {
        let now = time_utils::now_millis();
        Subscription {
            id: 0,
            customer_id: self.customer_id,
            name: self.name,
            stripe_id: self.stripe_id,
            stripe_status: self.status,
            stripe_plan: String::new(),
            quantity: 0,
            trial_ends_at: self.trial_ends_at,
            ends_at: self.ends_at,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builder for customer fixtures
#[derive(Default)]
pub struct CustomerFixture {
    name: Option<String>,
    email: Option<String>,
    stripe_id: Option<String>,
    tax_percentage: Option<f64>,
}

impl CustomerFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Customer already known to the billing provider
    pub fn with_stripe_id(mut self, stripe_id: &str) -> Self {
        self.stripe_id = Some(stripe_id.to_string());
        self
    }

    pub fn with_tax_percentage(mut self, tax: f64) -> Self {
        self.tax_percentage = Some(tax);
        self
    }

    pub fn build(self) -> Customer {
        let mut customer = Customer::new(self.name, self.email);
        customer.stripe_id = self.stripe_id;
        customer.tax_percentage = self.tax_percentage;
        customer
    }
}

/// `count` unsynced subscriptions with ids `sub_000`, `sub_001`, ...
pub fn unsynced_subscriptions(count: usize) -> Vec<Subscription> {
    (0..count)
        .map(|n| SubscriptionFixture::new(&format!("sub_{n:03}")).build())
        .collect()
}
