//! Payment processing for the course platform
//!
//! Wraps the Stripe integration: checkout initiation, webhook-driven
//! reconciliation, bundle price management, and subscription lifecycle.
//! All money state flows through the webhook handlers; the request-path
//! services only ever create intents and hand back client secrets.

pub mod bundles;
pub mod checkout;
pub mod client;
pub mod customer;
pub mod error;
pub mod subscriptions;
pub mod webhooks;

pub use bundles::{BundleService, BundleUpdate, BundleWithCourses, NewBundle};
pub use checkout::{CheckoutResponse, CheckoutService};
pub use client::{StripeClient, StripeConfig};
pub use customer::CustomerService;
pub use error::{BillingError, BillingResult};
pub use subscriptions::{RecurringSignup, SubscriptionService, SubscriptionWithBundle};
pub use webhooks::WebhookHandler;

use sqlx::PgPool;

/// Facade bundling every billing service behind one Stripe client.
///
/// Constructed once at startup and shared through application state, so the
/// whole process talks to Stripe through a single configured client.
#[derive(Clone)]
pub struct BillingService {
    pub bundles: BundleService,
    pub checkout: CheckoutService,
    pub customers: CustomerService,
    pub subscriptions: SubscriptionService,
    stripe: StripeClient,
    pool: PgPool,
}

impl BillingService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self {
            bundles: BundleService::new(stripe.clone(), pool.clone()),
            checkout: CheckoutService::new(stripe.clone(), pool.clone()),
            customers: CustomerService::new(stripe.clone(), pool.clone()),
            subscriptions: SubscriptionService::new(stripe.clone(), pool.clone()),
            stripe,
            pool,
        }
    }

    /// Build from STRIPE_* environment variables, failing fast when unset
    pub fn from_env(pool: PgPool) -> BillingResult<Self> {
        let stripe = StripeClient::from_env()?;
        Ok(Self::new(stripe, pool))
    }

    /// Webhook handlers are constructed per use; they share the client and pool
    pub fn webhooks(&self) -> WebhookHandler {
        WebhookHandler::new(self.stripe.clone(), self.pool.clone())
    }

    /// Publishable key for the browser payment element
    pub fn publishable_key(&self) -> &str {
        &self.stripe.config().publishable_key
    }
}
