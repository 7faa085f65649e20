//! Subscription creation payload
//!
//! Encoded as form parameters in the provider's bracket notation, e.g.
//! `items[0][plan]=gold&items[0][quantity]=2&expand[]=latest_invoice.payment_intent`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expansion that returns the first payment intent with the new subscription
pub const EXPAND_PAYMENT_INTENT: &str = "latest_invoice.payment_intent";

/// One `{plan, quantity}` line of the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub plan: String,
    pub quantity: u64,
}

/// When the trial ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialEnd {
    /// End any trial immediately
    Now,
    /// Unix seconds
    At(i64),
}

impl TrialEnd {
    fn to_param(self) -> String {
        match self {
            Self::Now => "now".to_string(),
            Self::At(seconds) => seconds.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    pub items: Vec<PlanItem>,
    /// Unix seconds
    pub billing_cycle_anchor: Option<i64>,
    pub coupon: Option<String>,
    pub trial_end: Option<TrialEnd>,
    pub tax_percent: Option<f64>,
    pub metadata: BTreeMap<String, String>,
    pub expand: Vec<String>,
    pub off_session: bool,
}

impl SubscriptionPayload {
    /// Payload with the fixed expansion and off-session flag set
    pub fn new(items: Vec<PlanItem>) -> Self {
        Self {
            items,
            billing_cycle_anchor: None,
            coupon: None,
            trial_end: None,
            tax_percent: None,
            metadata: BTreeMap::new(),
            expand: vec![EXPAND_PAYMENT_INTENT.to_string()],
            off_session: true,
        }
    }

    /// Form parameters in a stable order
    ///
    /// Absent optional fields are left out entirely, as are a zero tax
    /// percentage and empty metadata.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = Vec::with_capacity(self.items.len() * 2 + 8);

        for (index, item) in self.items.iter().enumerate() {
            form.push((format!("items[{index}][plan]"), item.plan.clone()));
            form.push((format!("items[{index}][quantity]"), item.quantity.to_string()));
        }
        if let Some(anchor) = self.billing_cycle_anchor {
            form.push(("billing_cycle_anchor".to_string(), anchor.to_string()));
        }
        if let Some(coupon) = self.coupon.as_ref().filter(|c| !c.is_empty()) {
            form.push(("coupon".to_string(), coupon.clone()));
        }
        for expand in &self.expand {
            form.push(("expand[]".to_string(), expand.clone()));
        }
        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        if let Some(tax) = self.tax_percent.filter(|t| *t != 0.0) {
            form.push(("tax_percent".to_string(), tax.to_string()));
        }
        if let Some(trial_end) = self.trial_end {
            form.push(("trial_end".to_string(), trial_end.to_param()));
        }
        if self.off_session {
            form.push(("off_session".to_string(), "true".to_string()));
        }

        form
    }
}
