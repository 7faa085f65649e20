//! Storage capabilities used by the billing flows
//!
//! The reconciliation job and the subscription builder only see these traits,
//! so they run unchanged against SQLite or the in-memory store used in tests.

use async_trait::async_trait;

use crate::Result;
use crate::models::{Customer, Subscription, SubscriptionItem, SubscriptionStatus};

/// Subscription persistence
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Subscriptions to reconcile, in ascending id order
    ///
    /// With `empty_only` set, only rows whose status has never been synced.
    async fn select_for_reconcile(&self, empty_only: bool) -> Result<Vec<Subscription>>;

    /// Write `new` only if the stored status still equals `expected`
    ///
    /// Returns `false` when the row changed underneath (or vanished) and
    /// nothing was written.
    async fn update_status_if(
        &self,
        id: i64,
        expected: SubscriptionStatus,
        new: SubscriptionStatus,
    ) -> Result<bool>;

    /// Store a subscription and its items atomically, returning the saved rows
    ///
    /// Items are stored in slice order. Either everything is written or nothing is.
    async fn create_with_items(
        &self,
        subscription: &Subscription,
        items: &[SubscriptionItem],
    ) -> Result<(Subscription, Vec<SubscriptionItem>)>;

    /// Items of a subscription in insertion order
    async fn items_for(&self, subscription_id: i64) -> Result<Vec<SubscriptionItem>>;
}

/// Subscription owner persistence
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_customer(&self, id: i64) -> Result<Option<Customer>>;

    /// Remember the remote customer id for an owner
    async fn set_stripe_id(&self, id: i64, stripe_id: &str) -> Result<()>;
}
