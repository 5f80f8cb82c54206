//! Checkout initiation endpoint

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use coursebundle_billing::CheckoutResponse;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub bundle_id: i64,
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let response = state
        .billing
        .checkout
        .create_checkout_session(auth.user_id, request.bundle_id)
        .await?;

    Ok(Json(response))
}
