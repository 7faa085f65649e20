//! Mock implementations for testing

mod payment;
mod provider;
mod store;

pub use payment::RecordingPaymentConfirmation;
pub use provider::MockBillingProvider;
pub use store::InMemoryStore;
