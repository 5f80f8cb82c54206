//! Bundle endpoints
//!
//! Reads are public; writes require an authenticated creator.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use coursebundle_billing::{BundleUpdate, BundleWithCourses, NewBundle};
use coursebundle_shared::Bundle;

use crate::auth::{current_user, AuthUser};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BundleListQuery {
    pub creator_id: Option<Uuid>,
    pub course_id: Option<i64>,
}

pub async fn list_bundles(
    State(state): State<AppState>,
    Query(query): Query<BundleListQuery>,
) -> ApiResult<Json<Vec<Bundle>>> {
    let bundles = if let Some(creator_id) = query.creator_id {
        state.billing.bundles.list_by_creator(creator_id).await?
    } else if let Some(course_id) = query.course_id {
        state.billing.bundles.list_by_course(course_id).await?
    } else {
        state.billing.bundles.list_all().await?
    };

    Ok(Json(bundles))
}

pub async fn get_bundle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BundleWithCourses>> {
    let bundle = state.billing.bundles.get_bundle(id).await?;
    Ok(Json(bundle))
}

pub async fn create_bundle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<NewBundle>,
) -> ApiResult<Json<Bundle>> {
    let user = current_user(&state.pool, &auth).await?;
    let bundle = state.billing.bundles.create_bundle(&user, input).await?;
    Ok(Json(bundle))
}

pub async fn update_bundle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(input): Json<BundleUpdate>,
) -> ApiResult<Json<Bundle>> {
    let user = current_user(&state.pool, &auth).await?;
    let bundle = state.billing.bundles.update_bundle(&user, id, input).await?;
    Ok(Json(bundle))
}
