//! Test utilities for the cashier workspace
//!
//! In-memory storage, a scriptable billing provider and fixture builders, so
//! the billing flows can be exercised without a database or network access.

pub mod builders;
pub mod mocks;

pub use builders::{CustomerFixture, SubscriptionFixture, unsynced_subscriptions};
pub use mocks::{InMemoryStore, MockBillingProvider, RecordingPaymentConfirmation};
