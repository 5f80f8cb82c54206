//! Billing error types

use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

/// Errors surfaced by the billing services and webhook handlers
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Stripe API error: {0}")]
    Stripe(#[from] stripe::StripeError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("webhook signature verification failed")]
    WebhookSignatureInvalid,

    #[error("unsupported webhook payload: {0}")]
    WebhookEventNotSupported(String),

    #[error("bundle {0} not found")]
    BundleNotFound(i64),

    #[error("no user found for Stripe customer {0}")]
    CustomerNotFound(String),

    #[error("subscription {0} not found")]
    SubscriptionNotFound(i64),

    #[error("subscription {0} does not belong to the requesting user")]
    NotSubscriptionOwner(i64),

    #[error("recurring bundle {0} has no Stripe price reference")]
    MissingPriceReference(i64),

    #[error("missing required field in event metadata: {0}")]
    MissingMetadata(&'static str),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("creator role required")]
    CreatorRequired,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("missing configuration: {0}")]
    Config(&'static str),

    #[error("{0}")]
    Internal(String),
}
