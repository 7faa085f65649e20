//! Test data builders

mod fixtures;

pub use fixtures::{CustomerFixture, SubscriptionFixture, unsynced_subscriptions};
