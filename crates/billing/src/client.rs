//! Configured Stripe client
//!
//! Built once from the environment at startup and cloned into every service.
//! Handlers never construct their own `stripe::Client`.

use std::sync::Arc;

use crate::error::{BillingError, BillingResult};

/// Stripe configuration, all values required
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// Handed to the browser payment element, never used server-side
    pub publishable_key: String,
}

impl StripeConfig {
    /// Load from the environment, failing fast on anything missing
    pub fn from_env() -> BillingResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY"))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| BillingError::Config("STRIPE_WEBHOOK_SECRET"))?;
        let publishable_key = std::env::var("STRIPE_PUBLISHABLE_KEY")
            .map_err(|_| BillingError::Config("STRIPE_PUBLISHABLE_KEY"))?;

        Ok(Self {
            secret_key,
            webhook_secret,
            publishable_key,
        })
    }
}

/// Shared wrapper around the async-stripe client and its config
#[derive(Clone)]
pub struct StripeClient {
    inner: stripe::Client,
    config: Arc<StripeConfig>,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let inner = stripe::Client::new(config.secret_key.clone());
        Self {
            inner,
            config: Arc::new(config),
        }
    }

    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    pub fn inner(&self) -> &stripe::Client {
        &self.inner
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}
