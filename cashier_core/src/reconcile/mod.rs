//! Subscription status reconciliation
//!
//! Refreshes the locally stored status of subscriptions from the billing
//! provider, in fixed-size batches, one record at a time.

pub mod batch;
pub mod job;

pub use batch::{batch_count, partition};
pub use job::{
    DEFAULT_BATCH_DELAY, DEFAULT_CHUNK_SIZE, ReconcileOptions, ReconcileSummary, RecordOutcome,
    StatusReconciler,
};
