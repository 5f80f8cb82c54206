//! Subscription management
//!
//! Creates the Stripe-side recurring subscription once a setup intent has
//! succeeded, applies the webhook-driven state transitions, and handles the
//! user-facing cancel flow (Stripe first, local mark via webhook).

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use stripe::{
    CreateSubscription, CreateSubscriptionItems, Subscription as StripeSubscription,
    UpdateSubscription,
};
use time::OffsetDateTime;
use uuid::Uuid;

use coursebundle_shared::{Bundle, Frequency, Subscription};

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Everything needed to start a recurring subscription after setup succeeds
#[derive(Debug, Clone)]
pub struct RecurringSignup {
    pub stripe_customer_id: String,
    pub payment_method_id: String,
    pub buyer_id: Uuid,
    pub bundle_id: i64,
}

/// Subscription row joined with its bundle, for the account page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubscriptionWithBundle {
    pub id: i64,
    pub bundle_id: i64,
    pub bundle_name: String,
    pub payment_status: coursebundle_shared::SubscriptionStatus,
    pub price: f64,
    pub currency: String,
    pub frequency: Frequency,
    pub start_date: OffsetDateTime,
    pub end_date: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    stripe: StripeClient,
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        Self { stripe, pool }
    }

    /// Create the recurring subscription on Stripe, then insert the local
    /// Subscription(pending) and Payment(pending) rows.
    ///
    /// The pending rows are finalized later by `customer.subscription.created`
    /// and `payment_intent.succeeded` events.
    pub async fn create_recurring(&self, signup: RecurringSignup) -> BillingResult<String> {
        let bundle: Option<Bundle> = sqlx::query_as("SELECT * FROM bundles WHERE id = $1")
            .bind(signup.bundle_id)
            .fetch_optional(&self.pool)
            .await?;
        let bundle = bundle.ok_or(BillingError::BundleNotFound(signup.bundle_id))?;

        let price_id = bundle
            .stripe_price_id
            .as_deref()
            .ok_or(BillingError::MissingPriceReference(bundle.id))?;

        let customer_id = signup
            .stripe_customer_id
            .parse::<stripe::CustomerId>()
            .map_err(|e| BillingError::Internal(format!("invalid customer id: {}", e)))?;

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), signup.buyer_id.to_string());
        metadata.insert("bundle_id".to_string(), bundle.id.to_string());
        metadata.insert("creator_id".to_string(), bundle.creator_id.to_string());

        let mut params = CreateSubscription::new(customer_id);
        params.items = Some(vec![CreateSubscriptionItems {
            price: Some(price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]);
        params.metadata = Some(metadata);
        params.default_payment_method = Some(&signup.payment_method_id);

        let subscription = StripeSubscription::create(self.stripe.inner(), params).await?;

        let (local_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO subscriptions
                (user_id, bundle_id, payment_status, price, frequency, stripe_reference, start_date)
            VALUES ($1, $2, 'pending', $3, 'recurring', $4, NOW())
            RETURNING id
            "#,
        )
        .bind(signup.buyer_id)
        .bind(bundle.id)
        .bind(bundle.price)
        .bind(subscription.id.as_str())
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payments
                (user_id, creator_id, subscription_id, amount, currency, status, payment_method)
            VALUES ($1, $2, $3, $4, $5, 'pending', 'card')
            "#,
        )
        .bind(signup.buyer_id)
        .bind(bundle.creator_id)
        .bind(local_id)
        .bind(bundle.price)
        .bind(&bundle.currency)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            buyer_id = %signup.buyer_id,
            bundle_id = bundle.id,
            subscription_id = %subscription.id,
            local_subscription_id = local_id,
            "Created recurring subscription"
        );

        Ok(subscription.id.to_string())
    }

    /// Flip the pending subscription rows for (user, bundle) to paid.
    /// Returns the number of rows transitioned.
    pub async fn activate_pending(&self, user_id: Uuid, bundle_id: i64) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET payment_status = 'paid', updated_at = NOW()
            WHERE user_id = $1 AND bundle_id = $2 AND payment_status = 'pending'
            "#,
        )
        .bind(user_id)
        .bind(bundle_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Mark the live paid subscription matching `stripe_reference` cancelled,
    /// with `end_date` taken from the processor's cancel_at timestamp.
    /// The status filter makes redelivery a no-op.
    pub async fn cancel_from_event(
        &self,
        stripe_reference: &str,
        end_date: OffsetDateTime,
    ) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET payment_status = 'cancelled', end_date = $1, updated_at = NOW()
            WHERE stripe_reference = $2 AND payment_status = 'paid' AND end_date IS NULL
            "#,
        )
        .bind(end_date)
        .bind(stripe_reference)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// User-initiated cancel: validate ownership, then ask Stripe to cancel at
    /// period end. The local row stays untouched here; the cancelled mark is
    /// applied when the subscription.updated webhook arrives with cancel_at.
    /// A Stripe failure therefore leaves no inconsistent local state.
    pub async fn cancel_for_user(&self, user_id: Uuid, subscription_id: i64) -> BillingResult<()> {
        let subscription: Option<Subscription> =
            sqlx::query_as("SELECT * FROM subscriptions WHERE id = $1")
                .bind(subscription_id)
                .fetch_optional(&self.pool)
                .await?;

        let subscription =
            subscription.ok_or(BillingError::SubscriptionNotFound(subscription_id))?;

        if subscription.user_id != user_id {
            return Err(BillingError::NotSubscriptionOwner(subscription_id));
        }

        if subscription.frequency != Frequency::Recurring
            || subscription.stripe_reference.is_empty()
        {
            return Err(BillingError::Validation(
                "only recurring subscriptions with a Stripe reference can be cancelled".into(),
            ));
        }

        let sub_id = subscription
            .stripe_reference
            .parse::<stripe::SubscriptionId>()
            .map_err(|e| BillingError::Internal(format!("invalid subscription id: {}", e)))?;

        let params = UpdateSubscription {
            cancel_at_period_end: Some(true),
            ..Default::default()
        };

        StripeSubscription::update(self.stripe.inner(), &sub_id, params).await?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = subscription_id,
            stripe_subscription = %sub_id,
            "Requested cancel at period end"
        );

        Ok(())
    }

    /// All subscription rows for a user, newest first, with bundle details
    pub async fn list_for_user(&self, user_id: Uuid) -> BillingResult<Vec<SubscriptionWithBundle>> {
        let rows: Vec<SubscriptionWithBundle> = sqlx::query_as(
            r#"
            SELECT s.id, s.bundle_id, b.name AS bundle_name, s.payment_status,
                   s.price, b.currency, s.frequency, s.start_date, s.end_date
            FROM subscriptions s
            JOIN bundles b ON b.id = s.bundle_id
            WHERE s.user_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
