//! In-memory storage for tests

use async_trait::async_trait;
use cashier_core::error::InternalError;
use cashier_core::models::time_utils;
use cashier_core::{
    Customer, CustomerStore, Error, Result, Subscription, SubscriptionItem, SubscriptionStatus,
    SubscriptionStore,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory [`SubscriptionStore`] and [`CustomerStore`]
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect another.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    customers: Vec<Customer>,
    subscriptions: Vec<Subscription>,
    items: Vec<SubscriptionItem>,
    next_id: i64,
    fail_persist: bool,
    fail_select: bool,
    fail_update_for: HashSet<i64>,
    update_calls: usize,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn lock(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a customer and return its id
    pub fn insert_customer(&self, mut customer: Customer) -> i64 {
        let mut state = lock(&self.state);
        customer.id = state.next_id();
        let id = customer.id;
        state.customers.push(customer);
        id
    }

    /// Insert a subscription and return its id
    pub fn insert_subscription(&self, mut subscription: Subscription) -> i64 {
        let mut state = lock(&self.state);
        subscription.id = state.next_id();
        let id = subscription.id;
        state.subscriptions.push(subscription);
        id
    }

    pub fn customer(&self, id: i64) -> Option<Customer> {
        lock(&self.state)
            .customers
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        lock(&self.state).subscriptions.clone()
    }

    pub fn items(&self) -> Vec<SubscriptionItem> {
        lock(&self.state).items.clone()
    }

    pub fn status_of(&self, stripe_id: &str) -> Option<SubscriptionStatus> {
        lock(&self.state)
            .subscriptions
            .iter()
            .find(|s| s.stripe_id == stripe_id)
            .map(|s| s.stripe_status)
    }

    /// Overwrite a status directly, as a concurrent writer would
    pub fn set_status(&self, stripe_id: &str, status: SubscriptionStatus) {
        let mut state = lock(&self.state);
        if let Some(subscription) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.stripe_id == stripe_id)
        {
            subscription.stripe_status = status;
        }
    }

    /// Make `create_with_items` fail without writing anything
    pub fn fail_persist(&self) {
        lock(&self.state).fail_persist = true;
    }

    pub fn fail_select(&self) {
        lock(&self.state).fail_select = true;
    }

    /// Make status updates of one subscription fail
    pub fn fail_update_for(&self, id: i64) {
        lock(&self.state).fail_update_for.insert(id);
    }

    /// Number of conditional status updates attempted
    pub fn update_calls(&self) -> usize {
        lock(&self.state).update_calls
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn select_for_reconcile(&self, empty_only: bool) -> Result<Vec<Subscription>> {
        let state = lock(&self.state);
        if state.fail_select {
            return Err(Error::Internal(InternalError::database("select failed")));
        }

        let mut selected: Vec<Subscription> = state
            .subscriptions
            .iter()
            .filter(|s| !empty_only || s.is_unsynced())
            .cloned()
            .collect();
        selected.sort_by_key(|s| s.id);
        Ok(selected)
    }

    async fn update_status_if(
        &self,
        id: i64,
        expected: SubscriptionStatus,
        new: SubscriptionStatus,
    ) -> Result<bool> {
        let mut state = lock(&self.state);
        state.update_calls += 1;
        if state.fail_update_for.contains(&id) {
            return Err(Error::Internal(InternalError::database("update failed")));
        }

        match state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id && s.stripe_status == expected)
        {
            Some(subscription) => {
                subscription.stripe_status = new;
                subscription.updated_at = time_utils::now_millis();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_with_items(
        &self,
        subscription: &Subscription,
        items: &[SubscriptionItem],
    ) -> Result<(Subscription, Vec<SubscriptionItem>)> {
        let mut state = lock(&self.state);
        if state.fail_persist {
            return Err(Error::Internal(InternalError::database("disk I/O error")));
        }

        let saved = Subscription {
            id: state.next_id(),
            ..subscription.clone()
        };
        let mut saved_items = Vec::with_capacity(items.len());
        for item in items {
            let saved_item = SubscriptionItem {
                id: state.next_id(),
                subscription_id: saved.id,
                ..item.clone()
            };
            saved_items.push(saved_item.clone());
            state.items.push(saved_item);
        }
        state.subscriptions.push(saved.clone());

        Ok((saved, saved_items))
    }

    async fn items_for(&self, subscription_id: i64) -> Result<Vec<SubscriptionItem>> {
        Ok(lock(&self.state)
            .items
            .iter()
            .filter(|i| i.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn find_customer(&self, id: i64) -> Result<Option<Customer>> {
        Ok(self.customer(id))
    }

    async fn set_stripe_id(&self, id: i64, stripe_id: &str) -> Result<()> {
        let mut state = lock(&self.state);
        match state.customers.iter_mut().find(|c| c.id == id) {
            Some(customer) => {
                customer.stripe_id = Some(stripe_id.to_string());
                Ok(())
            }
            None => Err(Error::Internal(InternalError::database(format!(
                "customer {id} vanished"
            )))),
        }
    }
}
