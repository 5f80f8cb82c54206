//! Stripe webhook handling
//!
//! Verifies event signatures, claims each event id exactly once, and
//! dispatches payment-lifecycle events to the reconciliation handlers that
//! mutate the subscriptions and payments tables.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use stripe::{Event, EventObject, EventType, PaymentIntent, SetupIntent, Webhook};
use time::OffsetDateTime;
use uuid::Uuid;

use coursebundle_shared::Bundle;

use crate::client::StripeClient;
use crate::customer::CustomerService;
use crate::error::{BillingError, BillingResult};
use crate::subscriptions::{RecurringSignup, SubscriptionService};

type HmacSha256 = Hmac<Sha256>;

/// Signature timestamp tolerance in seconds
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Events stuck in `processing` longer than this may be re-claimed
const PROCESSING_TIMEOUT_MINUTES: i32 = 30;

/// Verify a Stripe `t=...,v1=...` signature header against the payload.
///
/// `now` is the current unix time; factored out so tolerance checks are
/// testable with a fixed clock.
fn verify_signature(payload: &str, signature: &str, secret: &str, now: i64) -> BillingResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut v1_signature: Option<String> = None;

    for part in signature.split(',') {
        let kv: Vec<&str> = part.splitn(2, '=').collect();
        if kv.len() == 2 {
            match kv[0] {
                "t" => timestamp = kv[1].parse().ok(),
                "v1" => v1_signature = Some(kv[1].to_string()),
                _ => {}
            }
        }
    }

    let timestamp = timestamp.ok_or(BillingError::WebhookSignatureInvalid)?;
    let v1_signature = v1_signature.ok_or(BillingError::WebhookSignatureInvalid)?;

    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(
            timestamp = timestamp,
            now = now,
            "Webhook timestamp outside tolerance"
        );
        return Err(BillingError::WebhookSignatureInvalid);
    }

    let secret_key = secret.strip_prefix("whsec_").unwrap_or(secret);
    let signed_payload = format!("{}.{}", timestamp, payload);

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|_| BillingError::WebhookSignatureInvalid)?;
    mac.update(signed_payload.as_bytes());
    let computed = hex::encode(mac.finalize().into_bytes());

    if computed != v1_signature {
        return Err(BillingError::WebhookSignatureInvalid);
    }

    Ok(())
}

/// Webhook handler for Stripe events
pub struct WebhookHandler {
    pool: PgPool,
    webhook_secret: String,
    customers: CustomerService,
    subscriptions: SubscriptionService,
}

impl WebhookHandler {
    pub fn new(stripe: StripeClient, pool: PgPool) -> Self {
        let webhook_secret = stripe.config().webhook_secret.clone();
        let customers = CustomerService::new(stripe.clone(), pool.clone());
        let subscriptions = SubscriptionService::new(stripe, pool.clone());
        Self {
            pool,
            webhook_secret,
            customers,
            subscriptions,
        }
    }

    /// Verify and parse a Stripe webhook event.
    ///
    /// Tries the library verification first, then falls back to manual HMAC
    /// verification, which tolerates Stripe API versions newer than the ones
    /// async-stripe was generated against.
    pub fn verify_event(&self, payload: &str, signature: &str) -> BillingResult<Event> {
        match Webhook::construct_event(payload, signature, &self.webhook_secret) {
            Ok(event) => return Ok(event),
            Err(e) => {
                tracing::debug!(
                    stripe_error = %e,
                    "Standard webhook parsing failed, trying manual verification"
                );
            }
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        verify_signature(payload, signature, &self.webhook_secret, now)?;

        let event: Event = serde_json::from_str(payload).map_err(|e| {
            tracing::error!(parse_error = %e, "Failed to parse webhook event JSON");
            BillingError::WebhookSignatureInvalid
        })?;

        Ok(event)
    }

    /// Handle a verified Stripe event.
    ///
    /// Uses INSERT...ON CONFLICT...RETURNING to atomically claim exclusive
    /// processing rights for the event id, so redelivered events are
    /// acknowledged without reprocessing. Retries of errored events and
    /// events stuck in `processing` past the timeout may be re-claimed.
    pub async fn handle_event(&self, event: Event) -> BillingResult<()> {
        let event_id = event.id.to_string();
        let event_type_str = event.type_.to_string();

        let event_timestamp = OffsetDateTime::from_unix_timestamp(event.created)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());

        let claimed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO stripe_webhook_events
                (stripe_event_id, event_type, event_timestamp, processing_result, processing_started_at)
            VALUES ($1, $2, $3, 'processing', NOW())
            ON CONFLICT (stripe_event_id) DO UPDATE SET
                processing_result = 'processing',
                processing_started_at = NOW()
            WHERE stripe_webhook_events.processing_result = 'error'
               OR (stripe_webhook_events.processing_result = 'processing'
                   AND stripe_webhook_events.processing_started_at < NOW() - ($4 || ' minutes')::INTERVAL)
            RETURNING id
            "#,
        )
        .bind(&event_id)
        .bind(&event_type_str)
        .bind(event_timestamp)
        .bind(PROCESSING_TIMEOUT_MINUTES)
        .fetch_optional(&self.pool)
        .await?;

        if claimed.is_none() {
            tracing::info!(
                event_id = %event_id,
                event_type = %event_type_str,
                "Duplicate webhook event, acknowledging without reprocessing"
            );
            return Ok(());
        }

        tracing::info!(
            event_id = %event_id,
            event_type = %event_type_str,
            "Processing Stripe webhook event"
        );

        let result = self.process_event_internal(event).await;

        let (processing_result, error_message) = match &result {
            Ok(()) => ("success", None),
            Err(e) => ("error", Some(e.to_string())),
        };

        if let Err(e) = sqlx::query(
            r#"
            UPDATE stripe_webhook_events
            SET processing_result = $1, error_message = $2
            WHERE stripe_event_id = $3
            "#,
        )
        .bind(processing_result)
        .bind(&error_message)
        .bind(&event_id)
        .execute(&self.pool)
        .await
        {
            tracing::error!(
                event_id = %event_id,
                error = %e,
                "Failed to record webhook processing result"
            );
        }

        result
    }

    async fn process_event_internal(&self, event: Event) -> BillingResult<()> {
        let event_type = event.type_.clone();
        match event_type {
            EventType::SetupIntentSucceeded => {
                self.handle_setup_succeeded(event).await?;
            }
            EventType::PaymentIntentSucceeded => {
                self.handle_payment_succeeded(event).await?;
            }
            EventType::CustomerSubscriptionCreated => {
                self.handle_subscription_created(event).await?;
            }
            EventType::CustomerSubscriptionUpdated => {
                self.handle_subscription_updated(event).await?;
            }
            EventType::CustomerSubscriptionDeleted => {
                self.handle_subscription_deleted(event).await?;
            }
            EventType::PaymentIntentPaymentFailed => {
                self.handle_payment_failed(event).await?;
            }
            _ => {
                tracing::info!(
                    event_type = %event.type_,
                    event_id = %event.id,
                    "Received unhandled Stripe event type - acknowledging as no-op"
                );
            }
        }

        Ok(())
    }

    /// setup_intent.succeeded: the buyer's card is on file; create the
    /// recurring subscription on Stripe and the local pending rows.
    async fn handle_setup_succeeded(&self, event: Event) -> BillingResult<()> {
        let setup_intent = self.extract_setup_intent(event)?;

        let metadata = setup_intent.metadata.clone().unwrap_or_default();
        let buyer_id = metadata_uuid(&metadata, "user_id")?;
        let bundle_id = metadata_i64(&metadata, "bundle_id")?;
        // Presence-checked with the rest of the metadata; the authoritative
        // creator id is re-read from the bundle row.
        metadata_uuid(&metadata, "creator_id")?;

        let customer_id = match &setup_intent.customer {
            Some(stripe::Expandable::Id(id)) => id.to_string(),
            Some(stripe::Expandable::Object(c)) => c.id.to_string(),
            None => {
                return Err(BillingError::WebhookEventNotSupported(
                    "setup intent has no customer".to_string(),
                ))
            }
        };

        let payment_method_id = match &setup_intent.payment_method {
            Some(stripe::Expandable::Id(id)) => id.to_string(),
            Some(stripe::Expandable::Object(pm)) => pm.id.to_string(),
            None => {
                return Err(BillingError::WebhookEventNotSupported(
                    "setup intent has no payment method".to_string(),
                ))
            }
        };

        let subscription_id = self
            .subscriptions
            .create_recurring(RecurringSignup {
                stripe_customer_id: customer_id.clone(),
                payment_method_id,
                buyer_id,
                bundle_id,
            })
            .await?;

        tracing::info!(
            customer_id = %customer_id,
            subscription_id = %subscription_id,
            "Setup intent succeeded, recurring subscription created"
        );

        Ok(())
    }

    /// payment_intent.succeeded: money moved. One-time purchases get fresh
    /// paid rows; recurring charges complete the matching pending payment.
    async fn handle_payment_succeeded(&self, event: Event) -> BillingResult<()> {
        let payment_intent = self.extract_payment_intent(event)?;

        let amount = minor_units_to_amount(payment_intent.amount_received);
        let customer_id = customer_id_of(&payment_intent)?;
        let user_id = self.customers.user_id_for_customer(&customer_id).await?;

        let is_one_time = payment_intent.metadata.get("type").map(String::as_str) == Some("one_time");

        if is_one_time {
            let bundle_id = metadata_i64(&payment_intent.metadata, "bundle_id")?;

            let bundle: Option<Bundle> = sqlx::query_as("SELECT * FROM bundles WHERE id = $1")
                .bind(bundle_id)
                .fetch_optional(&self.pool)
                .await?;
            let bundle = bundle.ok_or(BillingError::BundleNotFound(bundle_id))?;

            let (subscription_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO subscriptions
                    (user_id, bundle_id, payment_status, price, frequency, stripe_reference, start_date)
                VALUES ($1, $2, 'paid', $3, 'one_time', $4, NOW())
                RETURNING id
                "#,
            )
            .bind(user_id)
            .bind(bundle_id)
            .bind(amount)
            .bind(payment_intent.id.as_str())
            .fetch_one(&self.pool)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO payments
                    (user_id, creator_id, subscription_id, amount, currency, status,
                     payment_method, stripe_transaction_id, payment_date)
                VALUES ($1, $2, $3, $4, $5, 'completed', 'card', $6, NOW())
                "#,
            )
            .bind(user_id)
            .bind(bundle.creator_id)
            .bind(subscription_id)
            .bind(amount)
            .bind(&bundle.currency)
            .bind(payment_intent.id.as_str())
            .execute(&self.pool)
            .await?;

            tracing::info!(
                user_id = %user_id,
                bundle_id = bundle_id,
                amount = amount,
                payment_intent = %payment_intent.id,
                "One-time purchase recorded as paid"
            );
        } else {
            // Recurring charge: complete the oldest matching pending payment
            let result = sqlx::query(
                r#"
                UPDATE payments
                SET status = 'completed', stripe_transaction_id = $1,
                    payment_date = NOW(), updated_at = NOW()
                WHERE id = (
                    SELECT id FROM payments
                    WHERE user_id = $2 AND status = 'pending' AND amount = $3
                    ORDER BY created_at
                    LIMIT 1
                )
                "#,
            )
            .bind(payment_intent.id.as_str())
            .bind(user_id)
            .bind(amount)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                tracing::warn!(
                    user_id = %user_id,
                    amount = amount,
                    payment_intent = %payment_intent.id,
                    "No pending payment matched a recurring charge"
                );
                return Err(BillingError::Internal(
                    "no pending payment matched the succeeded charge".to_string(),
                ));
            }

            tracing::info!(
                user_id = %user_id,
                amount = amount,
                payment_intent = %payment_intent.id,
                "Recurring payment completed"
            );
        }

        Ok(())
    }

    /// customer.subscription.created: activate the buyer's pending rows
    async fn handle_subscription_created(&self, event: Event) -> BillingResult<()> {
        let subscription = self.extract_subscription(event)?;

        let bundle_id = metadata_i64(&subscription.metadata, "bundle_id")?;
        let customer_id = match &subscription.customer {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(customer) => customer.id.to_string(),
        };
        let user_id = self.customers.user_id_for_customer(&customer_id).await?;

        let activated = self.subscriptions.activate_pending(user_id, bundle_id).await?;

        if activated == 0 {
            tracing::warn!(
                user_id = %user_id,
                bundle_id = bundle_id,
                subscription_id = %subscription.id,
                "Subscription created but no pending rows to activate"
            );
        } else {
            tracing::info!(
                user_id = %user_id,
                bundle_id = bundle_id,
                activated = activated,
                "Subscription activated"
            );
        }

        Ok(())
    }

    /// customer.subscription.updated: only a cancellation schedule is
    /// reconciled. Updates without cancel_at are an explicit no-op.
    async fn handle_subscription_updated(&self, event: Event) -> BillingResult<()> {
        let subscription = self.extract_subscription(event)?;

        let Some(cancel_at) = subscription.cancel_at else {
            tracing::debug!(
                subscription_id = %subscription.id,
                "Subscription updated without cancel_at, nothing to reconcile"
            );
            return Ok(());
        };

        self.apply_cancellation(subscription.id.as_str(), cancel_at)
            .await
    }

    /// customer.subscription.deleted: the subscription is gone on Stripe; mark
    /// the local row cancelled, falling back to ended_at / now for the end date.
    async fn handle_subscription_deleted(&self, event: Event) -> BillingResult<()> {
        let subscription = self.extract_subscription(event)?;

        let end_ts = subscription
            .cancel_at
            .or(subscription.ended_at)
            .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());

        self.apply_cancellation(subscription.id.as_str(), end_ts)
            .await
    }

    async fn apply_cancellation(&self, stripe_reference: &str, end_ts: i64) -> BillingResult<()> {
        let end_date = OffsetDateTime::from_unix_timestamp(end_ts)
            .map_err(|e| BillingError::Internal(format!("invalid cancel timestamp: {}", e)))?;

        let cancelled = self
            .subscriptions
            .cancel_from_event(stripe_reference, end_date)
            .await?;

        if cancelled == 0 {
            tracing::info!(
                stripe_reference = %stripe_reference,
                "No live paid subscription matched the cancellation (already cancelled?)"
            );
        } else {
            tracing::info!(
                stripe_reference = %stripe_reference,
                end_date = %end_date,
                "Subscription cancelled"
            );
        }

        Ok(())
    }

    /// payment_intent.payment_failed: record the failed attempt
    async fn handle_payment_failed(&self, event: Event) -> BillingResult<()> {
        let payment_intent = self.extract_payment_intent(event)?;

        let customer_id = customer_id_of(&payment_intent)?;
        let user_id = self.customers.user_id_for_customer(&customer_id).await?;

        // amount_received is zero on failure; record what was attempted
        let amount = minor_units_to_amount(payment_intent.amount);

        sqlx::query(
            r#"
            INSERT INTO payments
                (user_id, amount, currency, status, payment_method,
                 stripe_transaction_id, payment_date)
            VALUES ($1, $2, $3, 'failed', 'card', $4, NOW())
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(payment_intent.currency.to_string().to_uppercase())
        .bind(payment_intent.id.as_str())
        .execute(&self.pool)
        .await?;

        tracing::warn!(
            user_id = %user_id,
            amount = amount,
            payment_intent = %payment_intent.id,
            "Payment failed"
        );

        Ok(())
    }

    fn extract_setup_intent(&self, event: Event) -> BillingResult<SetupIntent> {
        match event.data.object {
            EventObject::SetupIntent(setup_intent) => Ok(setup_intent),
            _ => Err(BillingError::WebhookEventNotSupported(
                "Expected SetupIntent".to_string(),
            )),
        }
    }

    fn extract_payment_intent(&self, event: Event) -> BillingResult<PaymentIntent> {
        match event.data.object {
            EventObject::PaymentIntent(payment_intent) => Ok(payment_intent),
            _ => Err(BillingError::WebhookEventNotSupported(
                "Expected PaymentIntent".to_string(),
            )),
        }
    }

    fn extract_subscription(&self, event: Event) -> BillingResult<stripe::Subscription> {
        match event.data.object {
            EventObject::Subscription(subscription) => Ok(subscription),
            _ => Err(BillingError::WebhookEventNotSupported(
                "Expected Subscription".to_string(),
            )),
        }
    }
}

/// Convert Stripe minor units back to a whole-unit amount
fn minor_units_to_amount(minor: i64) -> f64 {
    minor as f64 / 100.0
}

fn metadata_field<'a>(
    metadata: &'a std::collections::HashMap<String, String>,
    key: &'static str,
) -> BillingResult<&'a str> {
    metadata
        .get(key)
        .map(String::as_str)
        .ok_or(BillingError::MissingMetadata(key))
}

fn metadata_uuid(
    metadata: &std::collections::HashMap<String, String>,
    key: &'static str,
) -> BillingResult<Uuid> {
    Uuid::parse_str(metadata_field(metadata, key)?).map_err(|_| BillingError::MissingMetadata(key))
}

fn metadata_i64(
    metadata: &std::collections::HashMap<String, String>,
    key: &'static str,
) -> BillingResult<i64> {
    metadata_field(metadata, key)?
        .parse()
        .map_err(|_| BillingError::MissingMetadata(key))
}

fn customer_id_of(payment_intent: &PaymentIntent) -> BillingResult<String> {
    match &payment_intent.customer {
        Some(stripe::Expandable::Id(id)) => Ok(id.to_string()),
        Some(stripe::Expandable::Object(c)) => Ok(c.id.to_string()),
        None => Err(BillingError::WebhookEventNotSupported(
            "payment intent has no customer".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::client::StripeConfig;
    use sqlx::postgres::PgPoolOptions;

    const SECRET: &str = "whsec_test_secret";

    /// Handler over a lazy pool that refuses connections, for exercising the
    /// dispatch paths that must not touch the database.
    fn offline_handler() -> WebhookHandler {
        let stripe = StripeClient::new(StripeConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: SECRET.to_string(),
            publishable_key: "pk_test_123".to_string(),
        });
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/unused")
            .unwrap();
        WebhookHandler::new(stripe, pool)
    }

    fn subscription_event(event_type: &str, cancel_at: Option<i64>) -> Event {
        let cancel_at = match cancel_at {
            Some(ts) => ts.to_string(),
            None => "null".to_string(),
        };
        let payload = format!(
            r#"{{
                "id": "evt_test_1",
                "object": "event",
                "api_version": "2023-10-16",
                "created": 1700000000,
                "livemode": false,
                "pending_webhooks": 1,
                "type": "{event_type}",
                "data": {{
                    "object": {{
                        "object": "subscription",
                        "id": "sub_123",
                        "automatic_tax": {{"enabled": false}},
                        "billing_cycle_anchor": 1700000000,
                        "cancel_at": {cancel_at},
                        "cancel_at_period_end": false,
                        "collection_method": "charge_automatically",
                        "created": 1700000000,
                        "currency": "eur",
                        "current_period_end": 1702592000,
                        "current_period_start": 1700000000,
                        "customer": "cus_123",
                        "items": {{
                            "object": "list",
                            "data": [],
                            "has_more": false,
                            "url": "/v1/subscription_items?subscription=sub_123"
                        }},
                        "livemode": false,
                        "metadata": {{"bundle_id": "1"}},
                        "start_date": 1700000000,
                        "status": "active"
                    }}
                }}
            }}"#
        );
        serde_json::from_str(&payload).unwrap()
    }

    fn sign(payload: &str, timestamp: i64, secret: &str) -> String {
        let key = secret.strip_prefix("whsec_").unwrap_or(secret);
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(key.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={},v1={}", timestamp, sig)
    }

    #[test]
    fn valid_signature_passes() {
        let payload = r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now, SECRET);
        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now, SECRET);
        let tampered = r#"{"id":"evt_2"}"#;
        assert!(matches!(
            verify_signature(tampered, &header, SECRET, now),
            Err(BillingError::WebhookSignatureInvalid)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now, "whsec_other");
        assert!(verify_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let signed_at = 1_700_000_000;
        let header = sign(payload, signed_at, SECRET);
        let now = signed_at + SIGNATURE_TOLERANCE_SECS + 1;
        assert!(verify_signature(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn timestamp_within_tolerance_passes() {
        let payload = r#"{"id":"evt_1"}"#;
        let signed_at = 1_700_000_000;
        let header = sign(payload, signed_at, SECRET);
        assert!(verify_signature(payload, &header, SECRET, signed_at + 299).is_ok());
    }

    #[test]
    fn malformed_header_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        assert!(verify_signature(payload, "not-a-signature", SECRET, now).is_err());
        assert!(verify_signature(payload, "t=abc,v1=def", SECRET, now).is_err());
        assert!(verify_signature(payload, &format!("t={}", now), SECRET, now).is_err());
    }

    #[tokio::test]
    async fn subscription_update_without_cancel_at_is_an_explicit_no_op() {
        // No cancellation schedule means nothing to reconcile; the handler
        // must return Ok before reaching the database (the pool here would
        // fail any query).
        let handler = offline_handler();
        let event = subscription_event("customer.subscription.updated", None);
        assert!(handler.process_event_internal(event).await.is_ok());
    }

    #[tokio::test]
    async fn subscription_update_with_cancel_at_reaches_reconciliation() {
        // With cancel_at set the handler proceeds to the cancellation
        // update, which surfaces the (unreachable) database.
        let handler = offline_handler();
        let event = subscription_event("customer.subscription.updated", Some(1_702_592_000));
        let result = handler.process_event_internal(event).await;
        assert!(matches!(result, Err(BillingError::Database(_))));
    }

    #[tokio::test]
    async fn unhandled_event_types_are_acknowledged_without_processing() {
        let handler = offline_handler();
        let event = subscription_event("customer.subscription.trial_will_end", None);
        assert!(handler.process_event_internal(event).await.is_ok());
    }

    #[test]
    fn minor_units_convert_to_whole_amounts() {
        assert_eq!(minor_units_to_amount(999), 9.99);
        assert_eq!(minor_units_to_amount(1000), 10.0);
        assert_eq!(minor_units_to_amount(0), 0.0);
    }

    #[test]
    fn metadata_helpers_surface_missing_or_invalid_keys() {
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("bundle_id".to_string(), "42".to_string());
        metadata.insert(
            "user_id".to_string(),
            "6f2f9ffb-9f05-4e74-8c3e-2f37ad0f0d10".to_string(),
        );
        metadata.insert("creator_id".to_string(), "not-a-uuid".to_string());

        assert_eq!(metadata_i64(&metadata, "bundle_id").unwrap(), 42);
        assert!(metadata_uuid(&metadata, "user_id").is_ok());
        assert!(matches!(
            metadata_uuid(&metadata, "creator_id"),
            Err(BillingError::MissingMetadata("creator_id"))
        ));
        assert!(matches!(
            metadata_i64(&metadata, "absent"),
            Err(BillingError::MissingMetadata("absent"))
        ));
    }
}
