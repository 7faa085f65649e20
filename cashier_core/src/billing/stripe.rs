//! Live billing provider backed by the Stripe REST API

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::http::HttpUtils;
use super::payload::SubscriptionPayload;
use super::payment::PaymentIntent;
use super::provider::{
    BillingProvider, CustomerOptions, ProviderResult, RemoteInvoice, RemoteSubscription,
    RemoteSubscriptionItem,
};
use crate::error::ProviderError;
use crate::models::SubscriptionStatus;
use crate::security::SecretKey;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

static IDEMPOTENCY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Connection settings for [`StripeClient`]
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_key: SecretKey,
    pub api_base: String,
    /// Retries after the first attempt, transient failures only
    pub max_retries: u32,
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: SecretKey) -> Self {
        Self {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            max_retries: 3,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for the Stripe API
pub struct StripeClient {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> ProviderResult<Self> {
        config
            .api_key
            .validate()
            .map_err(|e| ProviderError::not_configured(&e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cashier-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::not_configured(&format!("HTTP client: {e}")))?;

        if config.api_key.is_test_mode() {
            log::debug!("Stripe client using test-mode key against {}", config.api_base);
        }

        Ok(Self { http, config })
    }

    /// API URL for the given path segments, each one percent-encoded
    fn url(&self, segments: &[&str]) -> ProviderResult<Url> {
        let base = &self.config.api_base;
        let mut url = Url::parse(base)
            .map_err(|e| ProviderError::not_configured(&format!("Invalid API base '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::not_configured(&format!("Invalid API base '{base}'")))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> ProviderResult<RequestBuilder> {
        Ok(self
            .http
            .get(self.url(segments)?)
            .bearer_auth(self.config.api_key.expose_secret()))
    }

    /// POST carrying a fresh idempotency key, so retries are deduplicated
    fn post(&self, segments: &[&str], form: &[(String, String)]) -> ProviderResult<RequestBuilder> {
        Ok(self
            .http
            .post(self.url(segments)?)
            .bearer_auth(self.config.api_key.expose_secret())
            .header("Idempotency-Key", idempotency_key(segments))
            .form(form))
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> ProviderResult<T> {
        let body =
            HttpUtils::execute_request_with_retry(request, operation, self.config.max_retries)
                .await?;
        HttpUtils::parse_json(&body, operation)
    }
}

fn idempotency_key(segments: &[&str]) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let sequence = IDEMPOTENCY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "cashier-{}-{nanos:x}-{sequence}-{}",
        segments.first().copied().unwrap_or("root"),
        std::process::id()
    )
}

#[derive(Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Deserialize)]
struct PaymentMethodObject {
    id: String,
    #[serde(default)]
    customer: Option<String>,
}

#[derive(Deserialize)]
struct StatusObject {
    status: String,
}

#[derive(Deserialize)]
struct ListObject<T> {
    data: Vec<T>,
}

/// Field that is either an id or the expanded object
#[derive(Deserialize)]
#[serde(untagged)]
enum Expandable<T> {
    Object(T),
    Id(String),
}

#[derive(Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
    items: ListObject<ItemObject>,
    #[serde(default)]
    latest_invoice: Option<Expandable<InvoiceObject>>,
}

#[derive(Deserialize)]
struct ItemObject {
    id: String,
    #[serde(default)]
    plan: Option<IdObject>,
    #[serde(default)]
    price: Option<IdObject>,
    #[serde(default)]
    quantity: Option<i64>,
}

#[derive(Deserialize)]
struct InvoiceObject {
    id: String,
    #[serde(default)]
    payment_intent: Option<Expandable<PaymentIntent>>,
}

fn parse_status(raw: &str) -> ProviderResult<SubscriptionStatus> {
    let status: SubscriptionStatus = raw
        .parse()
        .map_err(|e: crate::error::ValidationError| ProviderError::parse(e.to_string()))?;

    // The provider never reports an empty status
    if status == SubscriptionStatus::Unsynced {
        return Err(ProviderError::parse("empty subscription status"));
    }
    Ok(status)
}

impl TryFrom<SubscriptionObject> for RemoteSubscription {
    type Error = ProviderError;

    fn try_from(object: SubscriptionObject) -> ProviderResult<Self> {
        let items = object
            .items
            .data
            .into_iter()
            .map(|item| {
                let plan = item
                    .plan
                    .or(item.price)
                    .map(|p| p.id)
                    .ok_or_else(|| ProviderError::parse(format!("item {} has no plan", item.id)))?;
                Ok(RemoteSubscriptionItem {
                    id: item.id,
                    plan,
                    quantity: item.quantity.unwrap_or(0),
                })
            })
            .collect::<ProviderResult<Vec<_>>>()?;

        let latest_invoice = match object.latest_invoice {
            Some(Expandable::Object(invoice)) => Some(RemoteInvoice {
                id: invoice.id,
                payment_intent: match invoice.payment_intent {
                    Some(Expandable::Object(intent)) => Some(intent),
                    _ => None,
                },
            }),
            Some(Expandable::Id(id)) => Some(RemoteInvoice {
                id,
                payment_intent: None,
            }),
            None => None,
        };

        Ok(RemoteSubscription {
            id: object.id,
            status: parse_status(&object.status)?,
            items,
            latest_invoice,
        })
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_customer(&self, options: &CustomerOptions) -> ProviderResult<String> {
        let request = self.post(&["customers"], &options.to_form())?;
        let customer: IdObject = self.send(request, "POST customers").await?;

        log::info!("Created billing customer {}", customer.id);
        Ok(customer.id)
    }

    async fn update_default_payment_method(
        &self,
        customer_id: &str,
        payment_method: &str,
    ) -> ProviderResult<()> {
        let request = self.get(&["payment_methods", payment_method])?;
        let method: PaymentMethodObject = self.send(request, "GET payment_methods").await?;

        if method.customer.as_deref() != Some(customer_id) {
            let form = [("customer".to_string(), customer_id.to_string())];
            let request = self.post(&["payment_methods", method.id.as_str(), "attach"], &form)?;
            let _: IdObject = self.send(request, "POST payment_methods/attach").await?;
            log::debug!("Attached payment method {} to {customer_id}", method.id);
        }

        let form = [(
            "invoice_settings[default_payment_method]".to_string(),
            method.id.clone(),
        )];
        let request = self.post(&["customers", customer_id], &form)?;
        let _: IdObject = self.send(request, "POST customers/update").await?;

        Ok(())
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        payload: &SubscriptionPayload,
    ) -> ProviderResult<RemoteSubscription> {
        let mut form = vec![("customer".to_string(), customer_id.to_string())];
        form.extend(payload.to_form());

        let request = self.post(&["subscriptions"], &form)?;
        let object: SubscriptionObject = self.send(request, "POST subscriptions").await?;

        RemoteSubscription::try_from(object)
    }

    async fn fetch_subscription_status(
        &self,
        subscription_id: &str,
    ) -> ProviderResult<SubscriptionStatus> {
        let request = self.get(&["subscriptions", subscription_id])?;
        let object: StatusObject = self.send(request, "GET subscriptions").await?;

        parse_status(&object.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_secret_key() {
        let result = StripeClient::new(StripeConfig::new(SecretKey::new("pk_test_123")));
        assert!(matches!(result, Err(ProviderError::NotConfigured { .. })));
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let config = StripeConfig::new(SecretKey::new("sk_test_123"))
            .with_api_base("http://localhost:12111/");
        let client = StripeClient::new(config).unwrap();

        assert_eq!(
            client.url(&["subscriptions", "sub_1"]).unwrap().as_str(),
            "http://localhost:12111/v1/subscriptions/sub_1"
        );
    }

    #[test]
    fn test_url_escapes_path_segments() {
        let client = StripeClient::new(StripeConfig::new(SecretKey::new("sk_test_123"))).unwrap();

        assert_eq!(
            client.url(&["subscriptions", "sub_1/cancel?x=1#y"]).unwrap().as_str(),
            "https://api.stripe.com/v1/subscriptions/sub_1%2Fcancel%3Fx=1%23y"
        );
    }

    #[test]
    fn test_invalid_api_base() {
        let config = StripeConfig::new(SecretKey::new("sk_test_123")).with_api_base("not a url");
        let client = StripeClient::new(config).unwrap();

        assert!(matches!(
            client.url(&["customers"]),
            Err(ProviderError::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_idempotency_keys_are_unique() {
        assert_ne!(idempotency_key(&["subscriptions"]), idempotency_key(&["subscriptions"]));
    }

    #[test]
    fn test_subscription_object_conversion() {
        let json = r#"{
            "id": "sub_1",
            "status": "incomplete",
            "items": {"object": "list", "data": [
                {"id": "si_b", "plan": {"id": "plan_b"}, "quantity": 3},
                {"id": "si_a", "price": {"id": "price_a"}}
            ]},
            "latest_invoice": {
                "id": "in_1",
                "payment_intent": {"id": "pi_1", "status": "requires_action", "client_secret": "pi_1_secret"}
            }
        }"#;
        let object: SubscriptionObject = serde_json::from_str(json).unwrap();
        let remote = RemoteSubscription::try_from(object).unwrap();

        assert_eq!(remote.status, SubscriptionStatus::Incomplete);
        assert_eq!(remote.items[0].plan, "plan_b");
        assert_eq!(remote.items[0].quantity, 3);
        assert_eq!(remote.items[1].plan, "price_a");
        assert_eq!(remote.items[1].quantity, 0);
        assert!(remote.payment_intent().unwrap().requires_action());
    }

    #[test]
    fn test_unexpanded_invoice_has_no_intent() {
        let json = r#"{"id": "sub_1", "status": "active", "items": {"data": []}, "latest_invoice": "in_1"}"#;
        let object: SubscriptionObject = serde_json::from_str(json).unwrap();
        let remote = RemoteSubscription::try_from(object).unwrap();

        assert_eq!(remote.latest_invoice.as_ref().map(|i| i.id.as_str()), Some("in_1"));
        assert!(remote.payment_intent().is_none());
    }

    #[test]
    fn test_unknown_status_is_a_parse_error() {
        assert!(matches!(
            parse_status("frozen"),
            Err(ProviderError::Parse { .. })
        ));
        assert!(matches!(parse_status(""), Err(ProviderError::Parse { .. })));
    }
}
