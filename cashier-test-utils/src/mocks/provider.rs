//! Scriptable billing provider for tests

use async_trait::async_trait;
use cashier_core::billing::{
    BillingProvider, CustomerOptions, PaymentIntent, ProviderResult, RemoteInvoice,
    RemoteSubscription, RemoteSubscriptionItem, SubscriptionPayload,
};
use cashier_core::{ProviderError, SubscriptionStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type FetchHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Mock implementation of [`BillingProvider`]
///
/// Remote subscriptions report `active` unless told otherwise. Every call is
/// recorded so tests can assert on what was sent.
///
/// ```rust,no_run
/// use cashier_test_utils::MockBillingProvider;
/// use cashier_core::{ProviderError, SubscriptionStatus};
///
/// let provider = MockBillingProvider::new();
/// provider.set_remote_status("sub_1", SubscriptionStatus::PastDue);
/// provider.fail_fetch("sub_2", ProviderError::api(404, "No such subscription"));
/// ```
#[derive(Clone, Default)]
pub struct MockBillingProvider {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    default_status: Option<SubscriptionStatus>,
    remote_statuses: HashMap<String, SubscriptionStatus>,
    fetch_failures: HashMap<String, ProviderError>,
    on_fetch: Option<FetchHook>,

    create_status: Option<SubscriptionStatus>,
    create_intent: Option<PaymentIntent>,
    create_failure: Option<ProviderError>,
    reverse_items: bool,

    customer_failure: Option<ProviderError>,
    payment_method_failure: Option<ProviderError>,

    fetch_calls: Vec<String>,
    created_customers: Vec<CustomerOptions>,
    default_payment_methods: Vec<(String, String)>,
    created_subscriptions: Vec<(String, SubscriptionPayload)>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status reported for subscriptions without an explicit status
    pub fn set_default_status(&self, status: SubscriptionStatus) {
        lock(&self.state).default_status = Some(status);
    }

    pub fn set_remote_status(&self, stripe_id: &str, status: SubscriptionStatus) {
        lock(&self.state)
            .remote_statuses
            .insert(stripe_id.to_string(), status);
    }

    /// Make status lookups for one subscription fail
    pub fn fail_fetch(&self, stripe_id: &str, error: ProviderError) {
        lock(&self.state)
            .fetch_failures
            .insert(stripe_id.to_string(), error);
    }

    /// Run `hook` with the subscription id on every status lookup
    pub fn on_fetch(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        lock(&self.state).on_fetch = Some(Arc::new(hook));
    }

    /// Status and payment intent returned for created subscriptions
    pub fn respond_to_create(&self, status: SubscriptionStatus, intent: Option<PaymentIntent>) {
        let mut state = lock(&self.state);
        state.create_status = Some(status);
        state.create_intent = intent;
    }

    pub fn fail_create(&self, error: ProviderError) {
        lock(&self.state).create_failure = Some(error);
    }

    /// Return created items in reverse payload order
    pub fn reverse_created_items(&self) {
        lock(&self.state).reverse_items = true;
    }

    pub fn fail_create_customer(&self, error: ProviderError) {
        lock(&self.state).customer_failure = Some(error);
    }

    pub fn fail_payment_method(&self, error: ProviderError) {
        lock(&self.state).payment_method_failure = Some(error);
    }

    /// Subscription ids looked up, in call order
    pub fn fetch_calls(&self) -> Vec<String> {
        lock(&self.state).fetch_calls.clone()
    }

    pub fn created_customers(&self) -> Vec<CustomerOptions> {
        lock(&self.state).created_customers.clone()
    }

    /// `(customer_id, payment_method)` pairs
    pub fn default_payment_methods(&self) -> Vec<(String, String)> {
        lock(&self.state).default_payment_methods.clone()
    }

    /// `(customer_id, payload)` pairs
    pub fn created_subscriptions(&self) -> Vec<(String, SubscriptionPayload)> {
        lock(&self.state).created_subscriptions.clone()
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn create_customer(&self, options: &CustomerOptions) -> ProviderResult<String> {
        let mut state = lock(&self.state);
        if let Some(error) = state.customer_failure.clone() {
            return Err(error);
        }
        state.created_customers.push(options.clone());
        Ok(format!("cus_mock_{}", state.created_customers.len()))
    }

    async fn update_default_payment_method(
        &self,
        customer_id: &str,
        payment_method: &str,
    ) -> ProviderResult<()> {
        let mut state = lock(&self.state);
        if let Some(error) = state.payment_method_failure.clone() {
            return Err(error);
        }
        state
            .default_payment_methods
            .push((customer_id.to_string(), payment_method.to_string()));
        Ok(())
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        payload: &SubscriptionPayload,
    ) -> ProviderResult<RemoteSubscription> {
        let mut state = lock(&self.state);
        if let Some(error) = state.create_failure.clone() {
            return Err(error);
        }
        state
            .created_subscriptions
            .push((customer_id.to_string(), payload.clone()));

        let number = state.created_subscriptions.len();
        let mut items: Vec<RemoteSubscriptionItem> = payload
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| RemoteSubscriptionItem {
                id: format!("si_mock_{number}_{index}"),
                plan: item.plan.clone(),
                quantity: item.quantity as i64,
            })
            .collect();
        if state.reverse_items {
            items.reverse();
        }

        Ok(RemoteSubscription {
            id: format!("sub_mock_{number}"),
            status: state.create_status.unwrap_or(SubscriptionStatus::Active),
            items,
            latest_invoice: Some(RemoteInvoice {
                id: format!("in_mock_{number}"),
                payment_intent: state.create_intent.clone(),
            }),
        })
    }

    async fn fetch_subscription_status(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<SubscriptionStatus> {
        let hook = {
            let mut state = lock(&self.state);
            state.fetch_calls.push(subscription_id.to_string());
            state.on_fetch.clone()
        };
        if let Some(hook) = hook {
            hook(subscription_id);
        }

        let state = lock(&self.state);
        if let Some(error) = state.fetch_failures.get(subscription_id) {
            return Err(error.clone());
        }
        Ok(state
            .remote_statuses
            .get(subscription_id)
            .copied()
            .or(state.default_status)
            .unwrap_or(SubscriptionStatus::Active))
    }
}
