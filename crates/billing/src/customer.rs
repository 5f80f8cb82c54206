//! Stripe customer management

use sqlx::PgPool;
use stripe::{CreateCustomer, Customer};
use uuid::Uuid;

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Lazily creates and caches the Stripe customer attached to a user
#[derive(Clone)]
pub struct CustomerService {
    stripe: StripeClient,
    pool: PgPool,
}

impl CustomerService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Return the user's Stripe customer id, creating the customer on first use.
    ///
    /// Idempotent per user: a user gets at most one customer, and the id is
    /// only ever written once.
    pub async fn ensure_customer(&self, user_id: Uuid) -> BillingResult<String> {
        let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT email, first_name, last_name, stripe_customer_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let (email, first_name, last_name, existing) =
            row.ok_or_else(|| BillingError::CustomerNotFound(user_id.to_string()))?;

        if let Some(customer_id) = existing {
            tracing::debug!(user_id = %user_id, customer_id = %customer_id, "Stripe customer already exists");
            return Ok(customer_id);
        }

        let name = format!("{} {}", first_name, last_name);
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());

        let params = CreateCustomer {
            email: Some(&email),
            name: Some(&name),
            metadata: Some(metadata),
            ..Default::default()
        };

        let customer = Customer::create(self.stripe.inner(), params).await?;

        // Attach the id; the WHERE guard keeps the first writer's id if two
        // checkouts race.
        sqlx::query(
            "UPDATE users SET stripe_customer_id = $1, updated_at = NOW()
             WHERE id = $2 AND stripe_customer_id IS NULL",
        )
        .bind(customer.id.as_str())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let stored: Option<String> =
            sqlx::query_scalar("SELECT stripe_customer_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let customer_id = stored.unwrap_or_else(|| customer.id.to_string());

        tracing::info!(
            user_id = %user_id,
            customer_id = %customer_id,
            "Created Stripe customer"
        );

        Ok(customer_id)
    }

    /// Resolve a Stripe customer id back to the local user
    pub async fn user_id_for_customer(&self, customer_id: &str) -> BillingResult<Uuid> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE stripe_customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(id,)| id)
            .ok_or_else(|| BillingError::CustomerNotFound(customer_id.to_string()))
    }
}
