//! Customer profile routes.

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    middleware,
    routing::{get, put},
};
use salon_common::{
    error::{SalonError, SalonResult},
    models::{Page, PageQuery, UpdateUserRequest, User},
    validation::validate_request,
};
use salon_db::{
    repository::{accounts, users},
    storage::ImageKind,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext, routes::images};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(list_users))
        .route("/user/me", get(get_me).patch(update_me))
        .route(
            "/user/me/image",
            put(upload_my_image).layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route("/user/{user_id}", get(get_user).delete(delete_user))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

async fn my_profile(state: &AppState, auth: &AuthContext) -> SalonResult<User> {
    users::find_by_auth_id(&state.db.pg, auth.account_id)
        .await?
        .ok_or_else(|| SalonError::not_found("User profile"))
}

/// GET /api/v1/user (staff)
async fn list_users(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> SalonResult<Json<Page<User>>> {
    auth.require_staff()?;

    let (limit, offset) = query.bounds(&salon_common::config::get().limits);
    let pattern = query.search_pattern();
    let (items, total) =
        users::list_users(&state.db.pg, pattern.as_deref(), limit, offset).await?;

    Ok(Json(Page::new(items, limit, offset, total)))
}

/// GET /api/v1/user/me
async fn get_me(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> SalonResult<Json<User>> {
    Ok(Json(my_profile(&state, &auth).await?))
}

/// PATCH /api/v1/user/me
async fn update_me(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateUserRequest>,
) -> SalonResult<Json<User>> {
    validate_request(&body)?;

    let profile = my_profile(&state, &auth).await?;
    let updated = users::update_user(
        &state.db.pg,
        profile.id,
        body.first_name.as_deref().map(str::trim),
        body.last_name.as_deref().map(str::trim),
        body.phone.as_deref(),
    )
    .await?;

    Ok(Json(updated))
}

/// PUT /api/v1/user/me/image (multipart, field `image`)
async fn upload_my_image(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> SalonResult<Json<User>> {
    let profile = my_profile(&state, &auth).await?;
    let upload =
        images::read_image(multipart, salon_common::config::get().limits.max_image_bytes).await?;

    let url = images::replace_image(
        &state,
        ImageKind::User,
        profile.id,
        upload,
        profile.image_url.as_deref(),
    )
    .await?;
    users::set_image(&state.db.pg, profile.id, &url).await?;

    Ok(Json(User {
        image_url: Some(url),
        ..profile
    }))
}

/// GET /api/v1/user/:user_id (staff)
async fn get_user(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> SalonResult<Json<User>> {
    auth.require_staff()?;

    let user = users::find_by_id(&state.db.pg, user_id)
        .await?
        .ok_or_else(|| SalonError::not_found("User"))?;
    Ok(Json(user))
}

/// DELETE /api/v1/user/:user_id (admin)
///
/// Soft-deletes the profile and its login. Past appointments keep their snapshots.
async fn delete_user(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_admin()?;

    let user = users::find_by_id(&state.db.pg, user_id)
        .await?
        .ok_or_else(|| SalonError::not_found("User"))?;

    let mut tx = state.db.pg.begin().await?;
    users::soft_delete(&mut *tx, user.id).await?;
    accounts::soft_delete(&mut *tx, user.auth_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, deleted_by = %auth.account_id, "User deleted");
    Ok(Json(serde_json::json!({ "status": true })))
}
