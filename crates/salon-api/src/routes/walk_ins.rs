//! Walk-in customer routes (front desk).

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::get,
};
use salon_common::{
    error::{SalonError, SalonResult},
    ids,
    models::{CreateWalkInRequest, Page, PageQuery, UpdateWalkInRequest, WalkIn},
    validation::{validate_name, validate_request},
};
use salon_db::repository::walk_ins;
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/walk-in", get(list_walk_ins).post(create_walk_in))
        .route(
            "/walk-in/{walk_in_id}",
            get(get_walk_in).patch(update_walk_in).delete(delete_walk_in),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// GET /api/v1/walk-in
async fn list_walk_ins(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> SalonResult<Json<Page<WalkIn>>> {
    auth.require_staff()?;

    let (limit, offset) = query.bounds(&salon_common::config::get().limits);
    let pattern = query.search_pattern();
    let (items, total) =
        walk_ins::list_walk_ins(&state.db.pg, pattern.as_deref(), limit, offset).await?;

    Ok(Json(Page::new(items, limit, offset, total)))
}

/// POST /api/v1/walk-in
async fn create_walk_in(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateWalkInRequest>,
) -> SalonResult<Json<WalkIn>> {
    auth.require_staff()?;
    validate_request(&body)?;
    validate_name(&body.first_name)?;
    validate_name(&body.last_name)?;

    let walk_in = walk_ins::create_walk_in(
        &state.db.pg,
        ids::generate_id(),
        body.first_name.trim(),
        body.last_name.trim(),
        body.email.as_deref().map(str::trim),
        body.phone.as_deref(),
        auth.account_id,
    )
    .await?;

    tracing::info!(walk_in_id = %walk_in.id, created_by = %auth.account_id, "Walk-in registered");
    Ok(Json(walk_in))
}

/// GET /api/v1/walk-in/:walk_in_id
async fn get_walk_in(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(walk_in_id): Path<Uuid>,
) -> SalonResult<Json<WalkIn>> {
    auth.require_staff()?;

    let walk_in = walk_ins::find_by_id(&state.db.pg, walk_in_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Walk-in"))?;
    Ok(Json(walk_in))
}

/// PATCH /api/v1/walk-in/:walk_in_id
async fn update_walk_in(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(walk_in_id): Path<Uuid>,
    Json(body): Json<UpdateWalkInRequest>,
) -> SalonResult<Json<WalkIn>> {
    auth.require_staff()?;
    validate_request(&body)?;

    let updated = walk_ins::update_walk_in(
        &state.db.pg,
        walk_in_id,
        body.first_name.as_deref().map(str::trim),
        body.last_name.as_deref().map(str::trim),
        body.email.as_deref().map(str::trim),
        body.phone.as_deref(),
    )
    .await?;

    Ok(Json(updated))
}

/// DELETE /api/v1/walk-in/:walk_in_id
async fn delete_walk_in(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(walk_in_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_staff()?;

    if !walk_ins::soft_delete(&state.db.pg, walk_in_id).await? {
        return Err(SalonError::not_found("Walk-in"));
    }

    tracing::info!(walk_in_id = %walk_in_id, deleted_by = %auth.account_id, "Walk-in deleted");
    Ok(Json(serde_json::json!({ "status": true })))
}
