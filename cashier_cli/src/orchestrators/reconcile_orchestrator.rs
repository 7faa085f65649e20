//! Subscription status reconciliation command
//!
//! Wires the configured database and Stripe client into the core
//! [`StatusReconciler`], renders its progress and prints a summary.

use crate::config::AppConfig;
use crate::progress::{create_progress_infrastructure, join_renderer, render_progress};
use anyhow::{Context, Result};
use cashier_core::{
    BillingProvider, Database, ReconcileOptions, ReconcileSummary, StatusReconciler, StripeClient,
    SubscriptionStore,
};
use colored::*;
use log::debug;
use std::sync::Arc;

/// Orchestrator for `cashier update-subscription-status`
pub struct ReconcileOrchestrator {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn BillingProvider>,
    options: ReconcileOptions,
}

impl ReconcileOrchestrator {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn BillingProvider>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            store,
            provider,
            options,
        }
    }

    /// Build from configuration; command-line values override configured ones
    ///
    /// Options are validated before the database or network is touched.
    pub async fn from_config(
        config: &AppConfig,
        chunk_size: Option<i64>,
        empty_only: Option<bool>,
    ) -> Result<Self> {
        let options = config
            .reconcile_options(chunk_size, empty_only)
            .context("Invalid reconciliation options")?;
        debug!("Reconcile options: {options:?}");

        let client = StripeClient::new(config.stripe_config()?)
            .context("Failed to create Stripe client")?;

        let db_path = config.database_path();
        let db = Database::new(&db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        Ok(Self::new(
            Arc::new(db.subscriptions()),
            Arc::new(client),
            options,
        ))
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run the job, printing progress lines and a final summary to stdout
    pub async fn run(&self) -> Result<ReconcileSummary> {
        let (provider, rx) = create_progress_infrastructure();
        let renderer = tokio::spawn(render_progress(rx, std::io::stdout()));

        let reconciler = StatusReconciler::new(self.store.clone(), self.provider.clone())
            .with_progress(provider.clone());
        let result = reconciler.run(&self.options).await;

        // The job completes the provider on success; close it on failure too
        provider.complete();
        join_renderer(renderer).await;

        let summary = result.context("Reconciliation could not start")?;
        print_summary(&summary);
        Ok(summary)
    }
}

fn print_summary(summary: &ReconcileSummary) {
    println!();
    if summary.processed == 0 {
        println!("{}", "No subscriptions needed reconciling".green());
        return;
    }

    println!("{}", "Reconciliation Complete".green().bold());
    println!(
        "Processed:  {} subscription(s) in {} chunk(s)",
        summary.processed.to_string().bold(),
        summary.batches
    );
    println!("  {} Updated:    {}", "✓".green(), summary.updated);
    println!("  {} Unchanged:  {}", "○".yellow(), summary.unchanged);
    if summary.conflicts > 0 {
        println!("  {} Conflicts:  {}", "!".yellow(), summary.conflicts);
    }
    println!("  {} Failed:     {}", "✗".red(), summary.failed);
    println!("Time elapsed: {:.2}s", summary.duration.as_secs_f64());
}
