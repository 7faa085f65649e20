//! Progress reporting abstractions
//!
//! The reconciliation job reports what it is doing through [`ProgressProvider`]
//! without knowing whether anyone is listening; the CLI renders the updates
//! as console lines.

use crate::models::SubscriptionStatus;

/// Core trait for progress reporting
pub trait ProgressProvider: Send + Sync {
    /// Report a progress update
    fn report(&self, update: ProgressUpdate);

    /// Signal that the operation is complete
    fn complete(&self);
}

/// Reconciliation progress events
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// A batch is about to be processed; `index` is 1-based
    BatchStarted { index: usize, total: usize },

    /// Local status of a record before syncing
    RecordStarted {
        stripe_id: String,
        status: SubscriptionStatus,
    },

    /// Local status of a record after syncing
    RecordFinished {
        stripe_id: String,
        status: SubscriptionStatus,
    },

    /// Record could not be synced and was skipped
    RecordFailed { stripe_id: String, message: String },
}

/// Null implementation for when no progress is needed
pub struct NullProvider;

impl ProgressProvider for NullProvider {
    fn report(&self, _update: ProgressUpdate) {}

    fn complete(&self) {}
}
