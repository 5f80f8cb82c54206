//! Stripe webhook endpoint
//!
//! Takes the raw body so signature verification sees exactly the bytes
//! Stripe signed. Unknown event types are acknowledged; verification
//! failures return 400 so Stripe retries only genuinely failed deliveries.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::json;

use coursebundle_billing::BillingError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Billing(BillingError::WebhookSignatureInvalid))?;

    let payload = std::str::from_utf8(&body)
        .map_err(|_| ApiError::Billing(BillingError::WebhookSignatureInvalid))?;

    let handler = state.billing.webhooks();
    let event = handler.verify_event(payload, signature)?;

    // Any handler failure becomes a 500 so Stripe redelivers the event;
    // the audit row keeps the specific error.
    handler
        .handle_event(event)
        .await
        .map_err(|e| ApiError::Billing(BillingError::Internal(e.to_string())))?;

    Ok(Json(json!({ "status": "ok" })))
}
