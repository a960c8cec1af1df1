//! Service catalog routes.

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
        CreateServiceRequest, Service, ServiceFilter, UpdateServiceRequest, check_price_fields,
    },
    validation::{validate_name, validate_request},
};
use salon_db::{repository::services, storage::ImageKind};
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext, routes::images};

pub fn router() -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/service", get(list_services))
        .route("/service/{service_id}", get(get_service));

    let admin = Router::new()
        .route("/service", post(create_service))
        .route(
            "/service/{service_id}",
            patch(update_service).delete(delete_service),
        )
        .route(
            "/service/{service_id}/image",
            put(upload_image).layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware));

    public.merge(admin)
}

async fn find_service(state: &AppState, service_id: Uuid) -> SalonResult<Service> {
    services::find_by_id(&state.db.pg, service_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Service"))
}

/// GET /api/v1/service?category=..&search=..
async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ServiceFilter>,
) -> SalonResult<Json<Vec<Service>>> {
    let pattern = salon_common::models::PageQuery {
        search: filter.search.clone(),
        ..Default::default()
    }
    .search_pattern();

    Ok(Json(
        services::list_services(&state.db.pg, &filter, pattern.as_deref()).await?,
    ))
}

/// GET /api/v1/service/:service_id
async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> SalonResult<Json<Service>> {
    Ok(Json(find_service(&state, service_id).await?))
}

/// POST /api/v1/service (admin)
async fn create_service(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateServiceRequest>,
) -> SalonResult<Json<Service>> {
    auth.require_admin()?;
    validate_request(&body)?;
    validate_name(&body.name)?;
    check_price_fields(Some(body.price), body.discount_percent)?;

    let service = services::create_service(&state.db.pg, ids::generate_id(), &body).await?;

    tracing::info!(service_id = %service.id, name = %service.name, "Service created");
    Ok(Json(service))
}

/// PATCH /api/v1/service/:service_id (admin)
///
/// Existing appointments keep the price they were booked at.
async fn update_service(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<UpdateServiceRequest>,
) -> SalonResult<Json<Service>> {
    auth.require_admin()?;
    validate_request(&body)?;
    check_price_fields(body.price, body.discount_percent)?;

    let updated = services::update_service(&state.db.pg, service_id, &body).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/service/:service_id (admin)
async fn delete_service(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_admin()?;

    if !services::soft_delete(&state.db.pg, service_id).await? {
        return Err(SalonError::not_found("Service"));
    }
    Ok(Json(serde_json::json!({ "status": true })))
}

/// PUT /api/v1/service/:service_id/image (admin)
async fn upload_image(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    multipart: Multipart,
) -> SalonResult<Json<Service>> {
    auth.require_admin()?;

    let service = find_service(&state, service_id).await?;
    let upload =
        images::read_image(multipart, salon_common::config::get().limits.max_image_bytes).await?;
    let url = images::replace_image(
        &state,
        ImageKind::Service,
        service.id,
        upload,
        service.image_url.as_deref(),
    )
    .await?;
    services::set_image(&state.db.pg, service.id, &url).await?;

    Ok(Json(Service {
        image_url: Some(url),
        ..service
    }))
}
