//! Credential handling for the billing provider

pub mod secret_key;

pub use secret_key::SecretKey;
