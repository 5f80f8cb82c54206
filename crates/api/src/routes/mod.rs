//! HTTP route definitions

mod bundles;
mod checkout;
mod config;
mod profile;
mod subscriptions;
mod webhooks;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::auth::require_auth;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/checkout", post(checkout::create_checkout))
        .route("/api/bundles", post(bundles::create_bundle))
        .route("/api/bundles/{id}", put(bundles::update_bundle))
        .route("/api/subscriptions", get(subscriptions::list_subscriptions))
        .route(
            "/api/subscriptions/{id}/cancel",
            post(subscriptions::cancel_subscription),
        )
        .route(
            "/api/profile",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .route("/api/webhooks/stripe", post(webhooks::stripe_webhook))
        .route("/api/bundles", get(bundles::list_bundles))
        .route("/api/bundles/{id}", get(bundles::get_bundle))
        .route("/api/config/stripe", get(config::stripe_config))
        .merge(protected)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
