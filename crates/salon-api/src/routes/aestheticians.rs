//! Aesthetician routes.

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    middleware,
    routing::{get, patch, post, put},
};
use salon_common::{
    error::{SalonError, SalonResult},
    ids,
    models::{
        Aesthetician, AestheticianFilter, CreateAestheticianRequest, UpdateAestheticianRequest,
    },
    validation::{validate_name, validate_request},
};
use salon_db::{
    repository::{aestheticians, branches},
    storage::ImageKind,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext, routes::images};

pub fn router() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/aesthetician", get(list_aestheticians))
        .route("/aesthetician/{aesthetician_id}", get(get_aesthetician));

    let admin = Router::new()
        .route("/aesthetician", post(create_aesthetician))
        .route(
            "/aesthetician/{aesthetician_id}",
            patch(update_aesthetician).delete(delete_aesthetician),
        )
        .route(
            "/aesthetician/{aesthetician_id}/image",
            put(upload_image).layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware));

    public.merge(admin)
}

async fn find_aesthetician(state: &AppState, id: Uuid) -> SalonResult<Aesthetician> {
    aestheticians::find_by_id(&state.db.pg, id)
        .await?
        .ok_or_else(|| SalonError::not_found("Aesthetician"))
}

async fn ensure_branch(state: &AppState, branch_id: Uuid) -> SalonResult<()> {
    branches::find_by_id(&state.db.pg, branch_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| SalonError::not_found("Branch"))
}

/// GET /api/v1/aesthetician?branch_id=..&available=true
async fn list_aestheticians(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AestheticianFilter>,
) -> SalonResult<Json<Vec<Aesthetician>>> {
    Ok(Json(aestheticians::list_aestheticians(&state.db.pg, &filter).await?))
}

/// GET /api/v1/aesthetician/:aesthetician_id
async fn get_aesthetician(
    State(state): State<Arc<AppState>>,
    Path(aesthetician_id): Path<Uuid>,
) -> SalonResult<Json<Aesthetician>> {
    Ok(Json(find_aesthetician(&state, aesthetician_id).await?))
}

/// POST /api/v1/aesthetician (admin)
async fn create_aesthetician(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAestheticianRequest>,
) -> SalonResult<Json<Aesthetician>> {
    auth.require_admin()?;
    validate_request(&body)?;
    validate_name(&body.first_name)?;
    validate_name(&body.last_name)?;
    ensure_branch(&state, body.branch_id).await?;

    let aesthetician =
        aestheticians::create_aesthetician(&state.db.pg, ids::generate_id(), &body).await?;

    tracing::info!(
        aesthetician_id = %aesthetician.id,
        branch_id = %aesthetician.branch_id,
        "Aesthetician created"
    );
    Ok(Json(aesthetician))
}

/// PATCH /api/v1/aesthetician/:aesthetician_id (admin)
async fn update_aesthetician(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(aesthetician_id): Path<Uuid>,
    Json(body): Json<UpdateAestheticianRequest>,
) -> SalonResult<Json<Aesthetician>> {
    auth.require_admin()?;
    validate_request(&body)?;
    if let Some(branch_id) = body.branch_id {
        ensure_branch(&state, branch_id).await?;
    }

    let updated =
        aestheticians::update_aesthetician(&state.db.pg, aesthetician_id, &body).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/aesthetician/:aesthetician_id (admin)
async fn delete_aesthetician(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(aesthetician_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_admin()?;

    if !aestheticians::soft_delete(&state.db.pg, aesthetician_id).await? {
        return Err(SalonError::not_found("Aesthetician"));
    }
    Ok(Json(serde_json::json!({ "status": true })))
}

/// PUT /api/v1/aesthetician/:aesthetician_id/image (admin)
async fn upload_image(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(aesthetician_id): Path<Uuid>,
    multipart: Multipart,
) -> SalonResult<Json<Aesthetician>> {
    auth.require_admin()?;

    let aesthetician = find_aesthetician(&state, aesthetician_id).await?;
    let upload =
        images::read_image(multipart, salon_common::config::get().limits.max_image_bytes).await?;
    let url = images::replace_image(
        &state,
        ImageKind::Aesthetician,
        aesthetician.id,
        upload,
        aesthetician.image_url.as_deref(),
    )
    .await?;
    aestheticians::set_image(&state.db.pg, aesthetician.id, &url).await?;

    Ok(Json(Aesthetician {
        image_url: Some(url),
        ..aesthetician
    }))
}
