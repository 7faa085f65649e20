//! Multi-plan subscription builder
//!
//! Collects plans and subscription options, then creates one remote
//! subscription holding every plan and mirrors it locally as a subscription
//! row plus one item row per plan.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use super::payload::{PlanItem, SubscriptionPayload, TrialEnd};
use super::payment::PaymentConfirmation;
use super::provider::{BillingProvider, CustomerOptions, RemoteSubscription};
use crate::error::{Error, PaymentError, SubscriptionError, ValidationError};
use crate::models::{Customer, Subscription, SubscriptionItem, time_utils};
use crate::store::{CustomerStore, SubscriptionStore};

/// Collaborators used by [`MultiPlanBuilder::create`]
#[derive(Clone, Copy)]
pub struct BillingServices<'a> {
    pub provider: &'a dyn BillingProvider,
    pub customers: &'a dyn CustomerStore,
    pub subscriptions: &'a dyn SubscriptionStore,
    pub payment: &'a dyn PaymentConfirmation,
}

/// Builder for a subscription spanning several plans
#[derive(Debug, Clone)]
pub struct MultiPlanBuilder {
    owner_id: i64,
    name: String,
    plans: Vec<PlanItem>,
    trial_expires: Option<DateTime<Utc>>,
    skip_trial: bool,
    billing_cycle_anchor: Option<DateTime<Utc>>,
    coupon: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl MultiPlanBuilder {
    /// Start a builder for `owner_id`; the subscription name is usually `default`
    pub fn new(owner_id: i64, name: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: name.into(),
            plans: Vec::new(),
            trial_expires: None,
            skip_trial: false,
            billing_cycle_anchor: None,
            coupon: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Add a plan with quantity 1
    pub fn add_plan(self, plan: impl Into<String>) -> Self {
        self.add_plan_with_quantity(plan, 1)
    }

    /// Add a plan, or replace the quantity of one already added
    ///
    /// A replaced plan keeps its original position.
    pub fn add_plan_with_quantity(mut self, plan: impl Into<String>, quantity: u64) -> Self {
        let plan = plan.into();
        match self.plans.iter_mut().find(|item| item.plan == plan) {
            Some(existing) => existing.quantity = quantity,
            None => self.plans.push(PlanItem { plan, quantity }),
        }
        self
    }

    pub fn plans(&self) -> &[PlanItem] {
        &self.plans
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trial ending `days` days from now
    pub fn trial_days(mut self, days: u32) -> Self {
        self.trial_expires = Some(Utc::now() + Duration::days(i64::from(days)));
        self
    }

    /// Trial ending at a fixed time
    pub fn trial_until(mut self, until: DateTime<Utc>) -> Self {
        self.trial_expires = Some(until);
        self
    }

    /// End any trial immediately, including one the plan would grant
    pub fn skip_trial(mut self) -> Self {
        self.skip_trial = true;
        self
    }

    pub fn anchor_billing_cycle_on(mut self, anchor: DateTime<Utc>) -> Self {
        self.billing_cycle_anchor = Some(anchor);
        self
    }

    pub fn with_coupon(mut self, coupon: impl Into<String>) -> Self {
        self.coupon = Some(coupon.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Remote creation payload for an owner with the given tax percentage
    pub fn build_payload(&self, tax_percent: Option<f64>) -> SubscriptionPayload {
        let mut payload = SubscriptionPayload::new(self.plans.clone());

        payload.billing_cycle_anchor = self
            .billing_cycle_anchor
            .map(|anchor| anchor.timestamp());
        payload.coupon = self.coupon.clone();
        payload.metadata = self.metadata.clone();
        payload.tax_percent = tax_percent;
        payload.trial_end = if self.skip_trial {
            Some(TrialEnd::Now)
        } else {
            self.trial_expires.map(|expires| TrialEnd::At(expires.timestamp()))
        };

        payload
    }

    /// Local trial end to store with the subscription
    fn trial_ends_at(&self) -> Option<i64> {
        if self.skip_trial {
            None
        } else {
            self.trial_expires.map(|expires| expires.timestamp_millis())
        }
    }

    /// Create the subscription remotely and record it locally
    ///
    /// `payment_method`, when given, becomes the customer's default before the
    /// subscription is created. `options` is used only if the owner has no
    /// remote customer yet.
    pub async fn create(
        &self,
        services: BillingServices<'_>,
        payment_method: Option<&str>,
        options: &CustomerOptions,
    ) -> Result<Subscription, SubscriptionError> {
        if self.plans.is_empty() {
            return Err(SubscriptionError::Invalid(ValidationError::missing_field(
                "plans",
            )));
        }

        let (owner, customer_id) = self
            .resolve_customer(services, payment_method, options)
            .await
            .map_err(|source| SubscriptionError::CustomerResolution {
                source: Box::new(source),
            })?;

        let payload = self.build_payload(owner.tax_percentage);
        let remote = services
            .provider
            .create_subscription(&customer_id, &payload)
            .await
            .map_err(|source| {
                log::warn!(
                    "Billing provider rejected subscription '{}' for owner {}: {source}",
                    self.name,
                    self.owner_id
                );
                SubscriptionError::RemoteRejected { source }
            })?;

        log::info!(
            "Created subscription {} ({}) with {} plan(s) for owner {}",
            remote.id,
            remote.status,
            remote.items.len(),
            self.owner_id
        );

        let subscription = self.persist(services, &remote).await?;

        if subscription.is_incomplete() {
            let failure = match remote.payment_intent() {
                Some(intent) => services.payment.validate(intent).await.err(),
                None => Some(PaymentError::MissingPaymentIntent),
            };

            if let Some(failure) = failure {
                log::warn!("Subscription {} is incomplete: {failure}", subscription.stripe_id);
                return Err(SubscriptionError::PaymentIncomplete {
                    subscription: Box::new(subscription),
                    failure,
                });
            }
        }

        Ok(subscription)
    }

    async fn resolve_customer(
        &self,
        services: BillingServices<'_>,
        payment_method: Option<&str>,
        options: &CustomerOptions,
    ) -> Result<(Customer, String), Error> {
        let owner = services
            .customers
            .find_customer(self.owner_id)
            .await?
            .ok_or_else(|| ValidationError::not_found("Customer", self.owner_id))?;

        let customer_id = match owner.stripe_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let mut options = options.clone();
                if options.email.is_none() {
                    options.email = owner.email.clone();
                }
                if options.name.is_none() {
                    options.name = owner.name.clone();
                }

                let id = services.provider.create_customer(&options).await?;
                if let Err(e) = services.customers.set_stripe_id(owner.id, &id).await {
                    log::error!(
                        "Billing customer {id} was created but could not be linked to owner {}: {e}",
                        owner.id
                    );
                    return Err(e);
                }
                id
            }
        };

        if let Some(payment_method) = payment_method {
            services
                .provider
                .update_default_payment_method(&customer_id, payment_method)
                .await?;
        }

        Ok((owner, customer_id))
    }

    async fn persist(
        &self,
        services: BillingServices<'_>,
        remote: &RemoteSubscription,
    ) -> Result<Subscription, SubscriptionError> {
        let now = time_utils::now_millis();
        let subscription = Subscription {
            id: 0,
            customer_id: self.owner_id,
            name: self.name.clone(),
            stripe_id: remote.id.clone(),
            stripe_status: remote.status,
            stripe_plan: String::new(),
            quantity: 0,
            trial_ends_at: self.trial_ends_at(),
            ends_at: None,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<SubscriptionItem> = remote
            .items
            .iter()
            .map(|item| SubscriptionItem {
                id: 0,
                subscription_id: 0,
                stripe_id: item.id.clone(),
                stripe_plan: item.plan.clone(),
                quantity: item.quantity,
                created_at: now,
                updated_at: now,
            })
            .collect();

        match services
            .subscriptions
            .create_with_items(&subscription, &items)
            .await
        {
            Ok((saved, _)) => Ok(saved),
            Err(source) => {
                log::error!(
                    "Subscription {} exists at the billing provider but could not be stored: {source}",
                    remote.id
                );
                Err(SubscriptionError::PartialPersistence {
                    stripe_id: remote.id.clone(),
                    source: Box::new(source),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_add_plan_defaults_to_quantity_one() {
        let builder = MultiPlanBuilder::new(1, "default").add_plan("gold");
        assert_eq!(
            builder.plans(),
            &[PlanItem {
                plan: "gold".to_string(),
                quantity: 1
            }]
        );
    }

    #[test]
    fn test_re_adding_a_plan_overwrites_in_place() {
        let builder = MultiPlanBuilder::new(1, "default")
            .add_plan("A")
            .add_plan_with_quantity("B", 2)
            .add_plan_with_quantity("A", 5);

        let plans: Vec<_> = builder
            .plans()
            .iter()
            .map(|p| (p.plan.as_str(), p.quantity))
            .collect();
        assert_eq!(plans, vec![("A", 5), ("B", 2)]);
    }

    #[test]
    fn test_payload_with_trial_anchor_and_coupon() {
        let trial = Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap();
        let anchor = Utc.with_ymd_and_hms(2030, 2, 1, 0, 0, 0).unwrap();
        let builder = MultiPlanBuilder::new(1, "default")
            .add_plan("gold")
            .trial_until(trial)
            .anchor_billing_cycle_on(anchor)
            .with_coupon("LAUNCH");

        let payload = builder.build_payload(Some(20.0));

        assert_eq!(payload.trial_end, Some(TrialEnd::At(trial.timestamp())));
        assert_eq!(payload.billing_cycle_anchor, Some(anchor.timestamp()));
        assert_eq!(payload.coupon.as_deref(), Some("LAUNCH"));
        assert_eq!(payload.tax_percent, Some(20.0));
        assert!(payload.off_session);
        assert_eq!(builder.trial_ends_at(), Some(trial.timestamp_millis()));
    }

    #[test]
    fn test_skip_trial_wins_over_configured_trial() {
        let builder = MultiPlanBuilder::new(1, "default")
            .add_plan("gold")
            .trial_days(14)
            .skip_trial();

        assert_eq!(builder.build_payload(None).trial_end, Some(TrialEnd::Now));
        assert_eq!(builder.trial_ends_at(), None);
    }

    #[test]
    fn test_no_trial_configured() {
        let builder = MultiPlanBuilder::new(1, "default").add_plan("gold");

        assert_eq!(builder.build_payload(None).trial_end, None);
        assert_eq!(builder.trial_ends_at(), None);
    }

    #[test]
    fn test_trial_days_is_in_the_future() {
        let builder = MultiPlanBuilder::new(1, "default").trial_days(7);
        let ends = builder.trial_ends_at().unwrap();
        let six_days = 6 * 24 * 60 * 60 * 1000;

        assert!(ends > time_utils::now_millis() + six_days);
    }
}
