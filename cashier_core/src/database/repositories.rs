//! SQLite implementations of the storage traits

pub mod customer;
pub mod subscription;

pub use customer::CustomerRepository;
pub use subscription::SubscriptionRepository;
