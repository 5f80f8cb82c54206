//! Public client configuration

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Publishable key for mounting the hosted payment element
pub async fn stripe_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "publishable_key": state.billing.publishable_key() }))
}
