//! API error mapping
//!
//! Translates billing and database errors into HTTP status codes with a
//! uniform `{"error": "..."}` body. Internal details are logged, never
//! returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use coursebundle_billing::BillingError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "authentication required".into())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Billing(e) => match e {
                BillingError::BundleNotFound(_)
                | BillingError::SubscriptionNotFound(_)
                | BillingError::CustomerNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                BillingError::NotSubscriptionOwner(_) | BillingError::CreatorRequired => {
                    (StatusCode::FORBIDDEN, e.to_string())
                }
                BillingError::WebhookSignatureInvalid => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                BillingError::Validation(_)
                | BillingError::InvalidCurrency(_)
                | BillingError::MissingPriceReference(_)
                | BillingError::MissingMetadata(_)
                | BillingError::WebhookEventNotSupported(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
                }
                BillingError::Stripe(_)
                | BillingError::Database(_)
                | BillingError::Config(_)
                | BillingError::Internal(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".into(),
                ),
            },
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_errors_map_to_expected_statuses() {
        let cases = [
            (BillingError::BundleNotFound(1), StatusCode::NOT_FOUND),
            (BillingError::NotSubscriptionOwner(1), StatusCode::FORBIDDEN),
            (BillingError::CreatorRequired, StatusCode::FORBIDDEN),
            (
                BillingError::WebhookSignatureInvalid,
                StatusCode::BAD_REQUEST,
            ),
            (
                BillingError::Validation("bad".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                BillingError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = ApiError::Billing(err).status_and_message();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::Billing(BillingError::Internal("connection string".into()));
        let (_, message) = err.status_and_message();
        assert_eq!(message, "internal server error");
    }
}
