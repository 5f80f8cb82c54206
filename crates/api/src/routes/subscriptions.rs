//! Subscription endpoints

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::json;

use coursebundle_billing::SubscriptionWithBundle;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<SubscriptionWithBundle>>> {
    let subscriptions = state
        .billing
        .subscriptions
        .list_for_user(auth.user_id)
        .await?;

    Ok(Json(subscriptions))
}

/// Request cancellation at period end. The local row is marked cancelled
/// later, by the subscription.updated webhook.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .billing
        .subscriptions
        .cancel_for_user(auth.user_id, id)
        .await?;

    Ok(Json(json!({ "status": "cancellation_requested" })))
}
