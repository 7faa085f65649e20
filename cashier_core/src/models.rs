//! Billing data model
//!
//! These structures map one-to-one onto the `customers`, `subscriptions` and
//! `subscription_items` tables. Timestamps are milliseconds since the Unix epoch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Subscription status as reported by the billing provider
///
/// `Unsynced` is the empty string: a local row whose remote status has never
/// been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    #[serde(rename = "")]
    Unsynced,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 9] = [
        Self::Unsynced,
        Self::Incomplete,
        Self::IncompleteExpired,
        Self::Trialing,
        Self::Active,
        Self::PastDue,
        Self::Canceled,
        Self::Unpaid,
        Self::Paused,
    ];

    /// Wire and storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsynced => "",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_parameter(
                    "status",
                    &format!("unknown subscription status '{s}'"),
                )
            })
    }
}

/// Subscription owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub stripe_id: Option<String>,
    pub tax_percentage: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Customer {
    /// Build an unsaved customer record
    pub fn new(name: Option<String>, email: Option<String>) -> Self {
        let now = time_utils::now_millis();
        Self {
            id: 0,
            name,
            email,
            stripe_id: None,
            tax_percentage: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_stripe_id(&self) -> bool {
        self.stripe_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Local subscription record
///
/// Multi-plan subscriptions keep `stripe_plan` empty and `quantity` at zero;
/// the plans live in [`SubscriptionItem`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub customer_id: i64,
    pub name: String,
    pub stripe_id: String,
    pub stripe_status: SubscriptionStatus,
    pub stripe_plan: String,
    pub quantity: i64,
    pub trial_ends_at: Option<i64>,
    pub ends_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Subscription {
    pub fn is_incomplete(&self) -> bool {
        self.stripe_status == SubscriptionStatus::Incomplete
    }

    pub fn is_unsynced(&self) -> bool {
        self.stripe_status == SubscriptionStatus::Unsynced
    }

    /// Whether the subscription spans several plans
    pub fn has_multiple_plans(&self) -> bool {
        self.stripe_plan.is_empty()
    }

    pub fn on_trial(&self, now_millis: i64) -> bool {
        self.trial_ends_at.is_some_and(|ends| now_millis < ends)
    }

    pub fn cancelled(&self) -> bool {
        self.ends_at.is_some()
    }

    pub fn on_grace_period(&self, now_millis: i64) -> bool {
        self.ends_at.is_some_and(|ends| now_millis < ends)
    }

    /// Active, trialing, or cancelled but still inside the paid period
    pub fn valid(&self, now_millis: i64) -> bool {
        let active = matches!(
            self.stripe_status,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        ) && !self.cancelled();

        active || self.on_trial(now_millis) || self.on_grace_period(now_millis)
    }
}

/// One plan line of a multi-plan subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub id: i64,
    pub subscription_id: i64,
    pub stripe_id: String,
    pub stripe_plan: String,
    pub quantity: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Time utilities for database timestamps
pub mod time_utils {
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Get current time as milliseconds since Unix epoch
    pub fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}
