//! Multi-plan subscription command

use crate::args::{parse_key_value, parse_plan};
use crate::config::AppConfig;
use crate::error::{CliError, ErrorContext};
use anyhow::{Context, Result};
use cashier_core::billing::PlanItem;
use cashier_core::{
    BillingProvider, BillingServices, CustomerOptions, CustomerStore, Database,
    IntentStatusValidation, MultiPlanBuilder, PaymentConfirmation, PaymentError, StripeClient,
    Subscription, SubscriptionError, SubscriptionStore,
};
use chrono::DateTime;
use clap::Args;
use colored::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Arguments of `cashier subscribe`
#[derive(Args, Debug, Clone)]
pub struct SubscribeRequest {
    /// Local customer id that owns the subscription
    #[arg(long)]
    pub owner: i64,

    /// Plan to subscribe to, optionally with a quantity (repeatable)
    #[arg(long = "plan", value_name = "PLAN[:QTY]", required = true, value_parser = parse_plan)]
    pub plans: Vec<PlanItem>,

    /// Subscription name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Payment method to make the customer's default
    #[arg(long, value_name = "PM")]
    pub payment_method: Option<String>,

    /// Trial length in days
    #[arg(long, value_name = "N", conflicts_with = "skip_trial")]
    pub trial_days: Option<u32>,

    /// End any trial immediately
    #[arg(long)]
    pub skip_trial: bool,

    #[arg(long)]
    pub coupon: Option<String>,

    /// Billing cycle anchor
    #[arg(long, value_name = "UNIX_SECONDS")]
    pub anchor: Option<i64>,

    /// Subscription metadata (repeatable)
    #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,

    /// Email for a newly created billing customer
    #[arg(long)]
    pub email: Option<String>,
}

impl SubscribeRequest {
    /// Translate the arguments into a configured builder
    pub fn builder(&self) -> Result<MultiPlanBuilder> {
        let mut builder = MultiPlanBuilder::new(self.owner, self.name.clone());
        for item in &self.plans {
            builder = builder.add_plan_with_quantity(item.plan.clone(), item.quantity);
        }

        if let Some(days) = self.trial_days {
            builder = builder.trial_days(days);
        }
        if self.skip_trial {
            builder = builder.skip_trial();
        }
        if let Some(anchor) = self.anchor {
            let anchor = DateTime::from_timestamp(anchor, 0)
                .with_context(|| format!("Invalid billing cycle anchor: {anchor}"))?;
            builder = builder.anchor_billing_cycle_on(anchor);
        }
        if let Some(coupon) = &self.coupon {
            builder = builder.with_coupon(coupon.clone());
        }
        if !self.metadata.is_empty() {
            builder = builder.with_metadata(self.metadata.iter().cloned().collect::<BTreeMap<_, _>>());
        }

        Ok(builder)
    }

    fn customer_options(&self) -> CustomerOptions {
        CustomerOptions {
            email: self.email.clone(),
            ..CustomerOptions::default()
        }
    }
}

/// Orchestrator for `cashier subscribe`
pub struct SubscribeOrchestrator {
    provider: Arc<dyn BillingProvider>,
    customers: Arc<dyn CustomerStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    payment: Arc<dyn PaymentConfirmation>,
}

impl SubscribeOrchestrator {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        customers: Arc<dyn CustomerStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        payment: Arc<dyn PaymentConfirmation>,
    ) -> Self {
        Self {
            provider,
            customers,
            subscriptions,
            payment,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let client = StripeClient::new(config.stripe_config()?)
            .context("Failed to create Stripe client")?;

        let db_path = config.database_path();
        let db = Database::new(&db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        Ok(Self::new(
            Arc::new(client),
            Arc::new(db.customers()),
            Arc::new(db.subscriptions()),
            Arc::new(IntentStatusValidation),
        ))
    }

    fn services(&self) -> BillingServices<'_> {
        BillingServices {
            provider: self.provider.as_ref(),
            customers: self.customers.as_ref(),
            subscriptions: self.subscriptions.as_ref(),
            payment: self.payment.as_ref(),
        }
    }

    /// Create the subscription and report the outcome
    ///
    /// A subscription whose first payment needs customer action is reported
    /// as a [`CliError`] with the payment details attached.
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscription> {
        let builder = request.builder()?;
        log::debug!(
            "Subscribing owner {} to {} plan(s)",
            request.owner,
            builder.plans().len()
        );

        match builder
            .create(
                self.services(),
                request.payment_method.as_deref(),
                &request.customer_options(),
            )
            .await
        {
            Ok(subscription) => {
                print_created(&subscription);
                Ok(subscription)
            }
            Err(error) => Err(describe_failure(&error).into()),
        }
    }
}

fn print_created(subscription: &Subscription) {
    println!(
        "{} subscription {} ({})",
        "✓ Created".green().bold(),
        subscription.stripe_id.cyan(),
        subscription.stripe_status
    );
    println!("  Name:   {}", subscription.name);
    println!("  Local:  #{}", subscription.id);
    if let Some(trial_ends_at) = subscription.trial_ends_at
        && let Some(ends) = DateTime::from_timestamp_millis(trial_ends_at)
    {
        println!("  Trial:  until {}", ends.format("%Y-%m-%d %H:%M UTC"));
    }
}

fn describe_failure(error: &SubscriptionError) -> CliError {
    let cli_error = CliError::from_subscription(error);

    match error {
        SubscriptionError::PaymentIncomplete {
            subscription,
            failure,
        } => {
            let cli_error = cli_error
                .with_context("subscription", &subscription.stripe_id)
                .with_context("status", subscription.stripe_status.as_str());
            match failure {
                PaymentError::ActionRequired {
                    intent_id,
                    client_secret,
                } => {
                    let cli_error = cli_error
                        .with_context("payment intent", intent_id)
                        .with_suggestion("Ask the customer to confirm the payment (e.g. 3-D Secure)");
                    match client_secret {
                        Some(secret) => cli_error.with_context("client secret", secret),
                        None => cli_error,
                    }
                }
                PaymentError::InvalidPaymentMethod { intent_id } => cli_error
                    .with_context("payment intent", intent_id)
                    .with_suggestion("Collect a new payment method and retry the invoice"),
                PaymentError::MissingPaymentIntent => cli_error
                    .with_suggestion("Check the latest invoice of the subscription in Stripe"),
            }
        }
        _ => cli_error,
    }
}
