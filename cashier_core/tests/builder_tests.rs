//! Multi-plan subscription creation against in-memory storage and a mock provider

use cashier_core::billing::{
    BillingServices, CustomerOptions, MultiPlanBuilder, PaymentIntent, TrialEnd,
};
use cashier_core::error::ValidationError;
use cashier_core::{Error, PaymentError, ProviderError, SubscriptionError, SubscriptionStatus};
use cashier_test_utils::{
    CustomerFixture, InMemoryStore, MockBillingProvider, RecordingPaymentConfirmation,
};
use std::collections::BTreeMap;

struct Harness {
    store: InMemoryStore,
    provider: MockBillingProvider,
    payment: RecordingPaymentConfirmation,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            provider: MockBillingProvider::new(),
            payment: RecordingPaymentConfirmation::new(),
        }
    }

    fn services(&self) -> BillingServices<'_> {
        BillingServices {
            provider: &self.provider,
            customers: &self.store,
            subscriptions: &self.store,
            payment: &self.payment,
        }
    }

    /// Ids of the payment intents handed to payment validation, in call order
    fn validated_intents(&self) -> Vec<String> {
        self.payment.calls().into_iter().map(|intent| intent.id).collect()
    }

    fn known_customer(&self) -> i64 {
        self.store.insert_customer(
            CustomerFixture::new()
                .with_email("ada@example.com")
                .with_stripe_id("cus_known")
                .build(),
        )
    }
}

#[tokio::test]
async fn test_creates_multi_plan_subscription() {
    let harness = Harness::new();
    let owner = harness.known_customer();

    let subscription = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .add_plan_with_quantity("seats", 5)
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    assert_eq!(subscription.customer_id, owner);
    assert_eq!(subscription.name, "default");
    assert_eq!(subscription.stripe_id, "sub_mock_1");
    assert_eq!(subscription.stripe_status, SubscriptionStatus::Active);
    assert_eq!(subscription.stripe_plan, "");
    assert_eq!(subscription.quantity, 0);
    assert_eq!(subscription.ends_at, None);
    assert!(subscription.has_multiple_plans());

    let items = harness.store.items();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.subscription_id == subscription.id));
    assert_eq!(items[0].stripe_plan, "gold");
    assert_eq!(items[0].quantity, 1);
    assert_eq!(items[1].stripe_plan, "seats");
    assert_eq!(items[1].quantity, 5);

    let created = harness.provider.created_subscriptions();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "cus_known");
    assert!(created[0].1.off_session);
    assert_eq!(created[0].1.expand, vec!["latest_invoice.payment_intent"]);
    assert!(harness.payment.calls().is_empty());
}

#[tokio::test]
async fn test_items_are_stored_in_remote_order() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness.provider.reverse_created_items();

    MultiPlanBuilder::new(owner, "default")
        .add_plan("A")
        .add_plan("B")
        .add_plan("C")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    let plans: Vec<String> = harness
        .store
        .items()
        .into_iter()
        .map(|i| i.stripe_plan)
        .collect();
    assert_eq!(plans, vec!["C", "B", "A"]);
}

#[tokio::test]
async fn test_re_added_plan_is_sent_once_in_first_position() {
    let harness = Harness::new();
    let owner = harness.known_customer();

    MultiPlanBuilder::new(owner, "default")
        .add_plan("A")
        .add_plan_with_quantity("B", 2)
        .add_plan_with_quantity("A", 5)
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    let (_, payload) = &harness.provider.created_subscriptions()[0];
    let sent: Vec<(&str, u64)> = payload
        .items
        .iter()
        .map(|i| (i.plan.as_str(), i.quantity))
        .collect();
    assert_eq!(sent, vec![("A", 5), ("B", 2)]);
}

#[tokio::test]
async fn test_skip_trial_stores_no_trial_end() {
    let harness = Harness::new();
    let owner = harness.known_customer();

    let subscription = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .trial_days(30)
        .skip_trial()
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    assert_eq!(subscription.trial_ends_at, None);
    let (_, payload) = &harness.provider.created_subscriptions()[0];
    assert_eq!(payload.trial_end, Some(TrialEnd::Now));
}

#[tokio::test]
async fn test_trial_end_is_stored_locally() {
    let harness = Harness::new();
    let owner = harness.known_customer();

    let subscription = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .trial_days(14)
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    let (_, payload) = &harness.provider.created_subscriptions()[0];
    let Some(TrialEnd::At(seconds)) = payload.trial_end else {
        panic!("expected a trial end timestamp, got {:?}", payload.trial_end);
    };
    assert_eq!(subscription.trial_ends_at.map(|ms| ms / 1000), Some(seconds));
}

#[tokio::test]
async fn test_owner_tax_and_metadata_are_sent() {
    let harness = Harness::new();
    let owner = harness.store.insert_customer(
        CustomerFixture::new()
            .with_stripe_id("cus_taxed")
            .with_tax_percentage(19.0)
            .build(),
    );
    let metadata = BTreeMap::from([("team".to_string(), "ops".to_string())]);

    MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .with_coupon("WELCOME")
        .with_metadata(metadata.clone())
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    let (_, payload) = &harness.provider.created_subscriptions()[0];
    assert_eq!(payload.tax_percent, Some(19.0));
    assert_eq!(payload.coupon.as_deref(), Some("WELCOME"));
    assert_eq!(payload.metadata, metadata);
}

#[tokio::test]
async fn test_incomplete_subscription_requiring_action() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness.provider.respond_to_create(
        SubscriptionStatus::Incomplete,
        Some(PaymentIntent::new("pi_3ds", "requires_action").with_client_secret("pi_3ds_secret")),
    );

    let err = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), Some("pm_card"), &CustomerOptions::default())
        .await
        .unwrap_err();

    match &err {
        SubscriptionError::PaymentIncomplete {
            subscription,
            failure,
        } => {
            assert_eq!(subscription.stripe_status, SubscriptionStatus::Incomplete);
            assert!(matches!(
                failure,
                PaymentError::ActionRequired { intent_id, .. } if intent_id == "pi_3ds"
            ));
        }
        other => panic!("expected PaymentIncomplete, got {other:?}"),
    }
    assert!(err.was_created());
    assert_eq!(err.remote_id(), Some("sub_mock_1"));
    assert_eq!(harness.validated_intents(), vec!["pi_3ds"]);
    assert!(harness.payment.calls()[0].requires_action());

    // Local record is kept for the follow-up confirmation
    assert_eq!(
        harness.store.status_of("sub_mock_1"),
        Some(SubscriptionStatus::Incomplete)
    );
}

#[tokio::test]
async fn test_incomplete_subscription_with_declined_card() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness.provider.respond_to_create(
        SubscriptionStatus::Incomplete,
        Some(PaymentIntent::new("pi_declined", "requires_payment_method")),
    );

    let err = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SubscriptionError::PaymentIncomplete {
            failure: PaymentError::InvalidPaymentMethod { .. },
            ..
        }
    ));
    assert_eq!(harness.validated_intents(), vec!["pi_declined"]);
}

#[tokio::test]
async fn test_incomplete_subscription_with_processing_intent_succeeds() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness.provider.respond_to_create(
        SubscriptionStatus::Incomplete,
        Some(PaymentIntent::new("pi_processing", "processing")),
    );

    let subscription = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    assert!(subscription.is_incomplete());
    assert_eq!(harness.validated_intents(), vec!["pi_processing"]);
}

#[tokio::test]
async fn test_incomplete_subscription_without_intent() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness
        .provider
        .respond_to_create(SubscriptionStatus::Incomplete, None);

    let err = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SubscriptionError::PaymentIncomplete {
            failure: PaymentError::MissingPaymentIntent,
            ..
        }
    ));
    assert!(harness.payment.calls().is_empty());
}

#[tokio::test]
async fn test_active_subscription_skips_payment_validation() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness.provider.respond_to_create(
        SubscriptionStatus::Active,
        Some(PaymentIntent::new("pi_ok", "succeeded")),
    );

    MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap();

    assert!(harness.payment.calls().is_empty());
}

#[tokio::test]
async fn test_remote_rejection_creates_nothing() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness
        .provider
        .fail_create(ProviderError::api(400, "No such plan: 'platinum'"));

    let err = MultiPlanBuilder::new(owner, "default")
        .add_plan("platinum")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::RemoteRejected { .. }));
    assert!(!err.was_created());
    assert_eq!(err.remote_id(), None);
    assert!(harness.store.subscriptions().is_empty());
    assert!(harness.store.items().is_empty());
}

#[tokio::test]
async fn test_storage_failure_reports_remote_id() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness.store.fail_persist();

    let err = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap_err();

    match &err {
        SubscriptionError::PartialPersistence { stripe_id, source } => {
            assert_eq!(stripe_id, "sub_mock_1");
            assert!(matches!(**source, Error::Internal(_)));
        }
        other => panic!("expected PartialPersistence, got {other:?}"),
    }
    assert!(!err.was_created());
    assert_eq!(err.remote_id(), Some("sub_mock_1"));
    assert!(harness.store.subscriptions().is_empty());
}

#[tokio::test]
async fn test_creates_remote_customer_when_missing() {
    let harness = Harness::new();
    let owner = harness.store.insert_customer(
        CustomerFixture::new()
            .with_name("Ada Lovelace")
            .with_email("ada@example.com")
            .build(),
    );

    MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(
            harness.services(),
            Some("pm_card_visa"),
            &CustomerOptions {
                description: Some("analytical engines".to_string()),
                ..CustomerOptions::default()
            },
        )
        .await
        .unwrap();

    let customers = harness.provider.created_customers();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].email.as_deref(), Some("ada@example.com"));
    assert_eq!(customers[0].name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(customers[0].description.as_deref(), Some("analytical engines"));

    assert_eq!(
        harness.store.customer(owner).unwrap().stripe_id.as_deref(),
        Some("cus_mock_1")
    );
    assert_eq!(
        harness.provider.default_payment_methods(),
        vec![("cus_mock_1".to_string(), "pm_card_visa".to_string())]
    );
    assert_eq!(harness.provider.created_subscriptions()[0].0, "cus_mock_1");
}

#[tokio::test]
async fn test_existing_remote_customer_is_reused() {
    let harness = Harness::new();
    let owner = harness.known_customer();

    MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), Some("pm_card"), &CustomerOptions::default())
        .await
        .unwrap();

    assert!(harness.provider.created_customers().is_empty());
    assert_eq!(
        harness.provider.default_payment_methods(),
        vec![("cus_known".to_string(), "pm_card".to_string())]
    );
}

#[tokio::test]
async fn test_payment_method_failure_creates_nothing() {
    let harness = Harness::new();
    let owner = harness.known_customer();
    harness
        .provider
        .fail_payment_method(ProviderError::api(402, "Your card was declined."));

    let err = MultiPlanBuilder::new(owner, "default")
        .add_plan("gold")
        .create(harness.services(), Some("pm_declined"), &CustomerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::CustomerResolution { .. }));
    assert!(harness.provider.created_subscriptions().is_empty());
}

#[tokio::test]
async fn test_unknown_owner_is_rejected() {
    let harness = Harness::new();

    let err = MultiPlanBuilder::new(404, "default")
        .add_plan("gold")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap_err();

    match err {
        SubscriptionError::CustomerResolution { source } => assert!(matches!(
            *source,
            Error::Validation(ValidationError::NotFound { .. })
        )),
        other => panic!("expected CustomerResolution, got {other:?}"),
    }
    assert!(harness.provider.created_subscriptions().is_empty());
}

#[tokio::test]
async fn test_builder_without_plans_is_invalid() {
    let harness = Harness::new();
    let owner = harness.known_customer();

    let err = MultiPlanBuilder::new(owner, "default")
        .create(harness.services(), None, &CustomerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SubscriptionError::Invalid(_)));
    assert!(harness.provider.created_customers().is_empty());
    assert!(harness.provider.created_subscriptions().is_empty());
}
