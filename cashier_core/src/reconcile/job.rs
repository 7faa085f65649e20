//! Status reconciliation job

use log::{debug, error, info, warn};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::batch::{batch_count, partition};
use crate::billing::BillingProvider;
use crate::error::{Error, ValidationError};
use crate::models::{Subscription, SubscriptionStatus};
use crate::progress::{NullProvider, ProgressProvider, ProgressUpdate};
use crate::Result;
use crate::store::SubscriptionStore;

pub const DEFAULT_CHUNK_SIZE: usize = 25;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Parameters of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub chunk_size: NonZeroUsize,
    /// Only reconcile subscriptions that were never synced
    pub empty_only: bool,
    /// Pause between consecutive batches
    pub batch_delay: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
            empty_only: true,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl ReconcileOptions {
    /// Validate a raw chunk size; zero and negative sizes are rejected
    pub fn new(chunk_size: i64, empty_only: bool) -> Result<Self> {
        let chunk_size = usize::try_from(chunk_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                Error::Validation(ValidationError::invalid_parameter(
                    "chunk_size",
                    &format!("must be a positive integer, got {chunk_size}"),
                ))
            })?;

        Ok(Self {
            chunk_size,
            empty_only,
            ..Self::default()
        })
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }
}

/// What happened to one subscription
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Remote status matched the stored one
    Unchanged,
    /// Stored status was replaced
    Updated {
        before: SubscriptionStatus,
        after: SubscriptionStatus,
    },
    /// Stored status changed while we were fetching; nothing written
    Conflict { expected: SubscriptionStatus },
    /// Record was skipped
    Failed { error: String, transient: bool },
}

/// Totals of a reconciliation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub batches: usize,
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub conflicts: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: &RecordOutcome) {
        self.processed += 1;
        match outcome {
            RecordOutcome::Unchanged => self.unchanged += 1,
            RecordOutcome::Updated { .. } => self.updated += 1,
            RecordOutcome::Conflict { .. } => self.conflicts += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Refreshes stored subscription statuses from the billing provider
pub struct StatusReconciler {
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn BillingProvider>,
    progress: Arc<dyn ProgressProvider>,
}

impl StatusReconciler {
    pub fn new(store: Arc<dyn SubscriptionStore>, provider: Arc<dyn BillingProvider>) -> Self {
        Self {
            store,
            provider,
            progress: Arc::new(NullProvider),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressProvider>) -> Self {
        self.progress = progress;
        self
    }

    /// Run one reconciliation pass
    ///
    /// Fails only if the subscriptions cannot be selected. Failures of
    /// individual records are logged, counted and skipped.
    pub async fn run(&self, options: &ReconcileOptions) -> Result<ReconcileSummary> {
        let start = Instant::now();
        let mut summary = ReconcileSummary::default();

        let subscriptions = self.store.select_for_reconcile(options.empty_only).await?;
        let total = batch_count(subscriptions.len(), options.chunk_size);

        info!(
            "Reconciling {} subscription(s) in {} batch(es) of up to {} (empty_only={})",
            subscriptions.len(),
            total,
            options.chunk_size,
            options.empty_only
        );

        for (index, batch) in partition(&subscriptions, options.chunk_size).enumerate() {
            if index > 0 && !options.batch_delay.is_zero() {
                tokio::time::sleep(options.batch_delay).await;
            }

            self.progress.report(ProgressUpdate::BatchStarted {
                index: index + 1,
                total,
            });
            summary.batches += 1;

            for subscription in batch {
                let outcome = self.reconcile_record(subscription).await;
                summary.record(&outcome);
            }
        }

        summary.duration = start.elapsed();
        self.progress.complete();

        info!(
            "Reconciliation finished: {} processed, {} updated, {} unchanged, {} conflicts, {} failed in {:?}",
            summary.processed,
            summary.updated,
            summary.unchanged,
            summary.conflicts,
            summary.failed,
            summary.duration
        );

        Ok(summary)
    }

    /// Sync one subscription's status, never failing the run
    pub async fn reconcile_record(&self, subscription: &Subscription) -> RecordOutcome {
        let before = subscription.stripe_status;
        let stripe_id = subscription.stripe_id.clone();

        self.progress.report(ProgressUpdate::RecordStarted {
            stripe_id: stripe_id.clone(),
            status: before,
        });

        let remote = match self.provider.fetch_subscription_status(&stripe_id).await {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to fetch status of subscription {stripe_id}: {e}");
                self.progress.report(ProgressUpdate::RecordFailed {
                    stripe_id,
                    message: e.to_string(),
                });
                return RecordOutcome::Failed {
                    error: e.to_string(),
                    transient: e.is_transient(),
                };
            }
        };

        if remote == before {
            debug!("Subscription {stripe_id} already '{before}'");
            self.progress.report(ProgressUpdate::RecordFinished {
                stripe_id,
                status: before,
            });
            return RecordOutcome::Unchanged;
        }

        match self
            .store
            .update_status_if(subscription.id, before, remote)
            .await
        {
            Ok(true) => {
                debug!("Subscription {stripe_id}: '{before}' -> '{remote}'");
                self.progress.report(ProgressUpdate::RecordFinished {
                    stripe_id,
                    status: remote,
                });
                RecordOutcome::Updated {
                    before,
                    after: remote,
                }
            }
            Ok(false) => {
                warn!(
                    "Subscription {stripe_id} changed since it was read (expected '{before}'), skipped"
                );
                self.progress.report(ProgressUpdate::RecordFailed {
                    stripe_id,
                    message: format!("status changed concurrently (expected '{before}')"),
                });
                RecordOutcome::Conflict { expected: before }
            }
            Err(e) => {
                error!("Failed to store status of subscription {stripe_id}: {e}");
                self.progress.report(ProgressUpdate::RecordFailed {
                    stripe_id,
                    message: e.to_string(),
                });
                RecordOutcome::Failed {
                    error: e.to_string(),
                    transient: e.is_transient(),
                }
            }
        }
    }
}
