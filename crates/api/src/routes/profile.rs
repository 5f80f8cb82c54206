//! Profile endpoints
//!
//! Partial updates: only the fields present in the PATCH body change.
//! Avatar handling stores the provided URL as-is; image processing happens
//! elsewhere.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use coursebundle_shared::User;

use crate::auth::{current_user, AuthUser};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub social: Option<serde_json::Value>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let user = current_user(&state.pool, &auth).await?;
    Ok(Json(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let user: User = sqlx::query_as(
        r#"
        UPDATE users
        SET display_name = COALESCE($1, display_name),
            email = COALESCE($2, email),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            description = COALESCE($5, description),
            avatar_url = COALESCE($6, avatar_url),
            social = COALESCE($7, social),
            updated_at = NOW()
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(&update.display_name)
    .bind(&update.email)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.description)
    .bind(&update.avatar_url)
    .bind(&update.social)
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(user_id = %auth.user_id, "Profile updated");

    Ok(Json(user))
}
