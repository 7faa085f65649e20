//! Billing API key with automatic memory zeroing

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ValidationError;

/// Secret API key that is wiped from memory on drop and never printed
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    inner: String,
}

impl SecretKey {
    /// Wrap a key without validating it
    pub fn new(key: impl Into<String>) -> Self {
        Self { inner: key.into() }
    }

    /// Wrap a key, accepting only secret (`sk_`) or restricted (`rk_`) keys
    pub fn parse(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = Self::new(key);
        key.validate()?;
        Ok(key)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.inner.trim().is_empty() {
            return Err(ValidationError::missing_field("stripe.api_key"));
        }
        if !(self.inner.starts_with("sk_") || self.inner.starts_with("rk_")) {
            return Err(ValidationError::invalid_parameter(
                "stripe.api_key",
                "expected a secret key starting with 'sk_' or 'rk_'",
            ));
        }
        Ok(())
    }

    /// Whether this is a test-mode key
    pub fn is_test_mode(&self) -> bool {
        self.inner.starts_with("sk_test_") || self.inner.starts_with("rk_test_")
    }

    /// Borrow the raw key for an outgoing request
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.inner.as_bytes(), other.inner.as_bytes());
        if a.len() != b.len() {
            return false;
        }

        let mut diff = 0u8;
        for (x, y) in a.iter().zip(b.iter()) {
            diff |= x ^ y;
        }
        diff == 0
    }
}

impl Eq for SecretKey {}

impl From<&str> for SecretKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
