//! Branch routes — locations, images, and slot availability.

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    middleware,
    routing::{get, patch, post, put},
};
use chrono::NaiveDate;
use salon_common::{
    error::{SalonError, SalonResult},
    ids,
    models::{AvailabilityQuery, Branch, CreateBranchRequest, PageQuery, UpdateBranchRequest},
    scheduling::{self, Slot},
    validation::{validate_name, validate_request},
};
use salon_db::{
    repository::{appointments, branches, services},
    storage::ImageKind,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext, routes::images};

pub fn router() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/branch", get(list_branches))
        .route("/branch/{branch_id}", get(get_branch))
        .route("/branch/{branch_id}/availability", get(availability));

    let admin = Router::new()
        .route("/branch", post(create_branch))
        .route(
            "/branch/{branch_id}",
            patch(update_branch).delete(delete_branch),
        )
        .route(
            "/branch/{branch_id}/image",
            put(upload_image).layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware));

    public.merge(admin)
}

async fn find_branch(state: &AppState, branch_id: Uuid) -> SalonResult<Branch> {
    branches::find_by_id(&state.db.pg, branch_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Branch"))
}

/// GET /api/v1/branch?search=
async fn list_branches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> SalonResult<Json<Vec<Branch>>> {
    let pattern = query.search_pattern();
    Ok(Json(branches::list_branches(&state.db.pg, pattern.as_deref()).await?))
}

/// GET /api/v1/branch/:branch_id
async fn get_branch(
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
) -> SalonResult<Json<Branch>> {
    Ok(Json(find_branch(&state, branch_id).await?))
}

#[derive(Serialize)]
struct AvailabilityResponse {
    branch_id: Uuid,
    service_id: Uuid,
    date: NaiveDate,
    duration_minutes: i32,
    capacity: i32,
    slots: Vec<Slot>,
}

/// GET /api/v1/branch/:branch_id/availability?service_id=..&date=YYYY-MM-DD
///
/// Split the working day into service-length slots and classify each one.
async fn availability(
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> SalonResult<Json<AvailabilityResponse>> {
    let service_id = query
        .service_id
        .ok_or_else(|| SalonError::validation("service_id is required"))?;
    let date = scheduling::parse_date(
        query
            .date
            .as_deref()
            .ok_or_else(|| SalonError::validation("date is required"))?,
    )?;

    let branch = find_branch(&state, branch_id).await?;
    let service = services::find_by_id(&state.db.pg, service_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Service"))?;

    let booked = appointments::booked_intervals_for_day(&state.db.pg, branch.id, date).await?;
    let now = salon_common::config::get().schedule.local_now();

    let slots = scheduling::build_slots(
        date,
        &state.window,
        service.duration_minutes,
        branch.slot_capacity,
        &booked,
        now,
    )?;

    Ok(Json(AvailabilityResponse {
        branch_id: branch.id,
        service_id: service.id,
        date,
        duration_minutes: service.duration_minutes,
        capacity: branch.slot_capacity,
        slots,
    }))
}

/// POST /api/v1/branch (admin)
async fn create_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBranchRequest>,
) -> SalonResult<Json<Branch>> {
    auth.require_admin()?;
    validate_request(&body)?;
    validate_name(&body.name)?;

    let branch = branches::create_branch(
        &state.db.pg,
        ids::generate_id(),
        body.name.trim(),
        body.phone.as_deref(),
        body.slot_capacity,
        &body.address,
    )
    .await?;

    tracing::info!(branch_id = %branch.id, name = %branch.name, "Branch created");
    Ok(Json(branch))
}

/// PATCH /api/v1/branch/:branch_id (admin)
///
/// Address fields are merged into the existing address.
async fn update_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
    Json(body): Json<UpdateBranchRequest>,
) -> SalonResult<Json<Branch>> {
    auth.require_admin()?;
    validate_request(&body)?;
    if let Some(name) = &body.name {
        validate_name(name)?;
    }

    let branch = branches::update_branch(&state.db.pg, branch_id, &body).await?;
    Ok(Json(branch))
}

/// DELETE /api/v1/branch/:branch_id (admin)
async fn delete_branch(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_admin()?;

    if !branches::soft_delete(&state.db.pg, branch_id).await? {
        return Err(SalonError::not_found("Branch"));
    }

    tracing::info!(branch_id = %branch_id, "Branch deleted");
    Ok(Json(serde_json::json!({ "status": true })))
}

/// PUT /api/v1/branch/:branch_id/image (admin, multipart field `image`)
async fn upload_image(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(branch_id): Path<Uuid>,
    multipart: Multipart,
) -> SalonResult<Json<Branch>> {
    auth.require_admin()?;

    let branch = find_branch(&state, branch_id).await?;
    let upload =
        images::read_image(multipart, salon_common::config::get().limits.max_image_bytes).await?;
    let url = images::replace_image(
        &state,
        ImageKind::Branch,
        branch.id,
        upload,
        branch.image_url.as_deref(),
    )
    .await?;
    branches::set_image(&state.db.pg, branch.id, &url).await?;

    Ok(Json(Branch {
        image_url: Some(url),
        ..branch
    }))
}
