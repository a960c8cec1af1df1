//! Voucher routes — promo code management and price quotes.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::get,
};
use chrono::Utc;
use salon_common::{
    error::{SalonError, SalonResult},
    ids,
    models::{
        CreateVoucherRequest, UpdateVoucherRequest, Voucher, VoucherQuoteQuery,
        check_voucher_terms, normalize_code,
    },
    pricing::{self, PriceQuote},
    validation::validate_request,
};
use salon_db::repository::{services, vouchers};
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, middleware::AuthContext};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voucher", get(list_vouchers).post(create_voucher))
        .route("/voucher/validate/{code}", get(validate_voucher))
        .route(
            "/voucher/{voucher_id}",
            get(get_voucher).patch(update_voucher).delete(delete_voucher),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// GET /api/v1/voucher (admin)
async fn list_vouchers(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
) -> SalonResult<Json<Vec<Voucher>>> {
    auth.require_admin()?;
    Ok(Json(vouchers::list_vouchers(&state.db.pg).await?))
}

/// POST /api/v1/voucher (admin)
async fn create_voucher(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateVoucherRequest>,
) -> SalonResult<Json<Voucher>> {
    auth.require_admin()?;
    validate_request(&body)?;
    check_voucher_terms(body.discount_type, body.value, body.valid_from, body.valid_until)?;

    let code = normalize_code(&body.code);
    if vouchers::find_by_code(&state.db.pg, &code).await?.is_some() {
        return Err(SalonError::AlreadyExists {
            resource: "Voucher code".into(),
        });
    }

    let voucher = vouchers::create_voucher(&state.db.pg, ids::generate_id(), &code, &body).await?;

    tracing::info!(voucher_id = %voucher.id, code = %voucher.code, "Voucher created");
    Ok(Json(voucher))
}

/// GET /api/v1/voucher/:voucher_id (admin)
async fn get_voucher(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(voucher_id): Path<Uuid>,
) -> SalonResult<Json<Voucher>> {
    auth.require_admin()?;

    let voucher = vouchers::find_by_id(&state.db.pg, voucher_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Voucher"))?;
    Ok(Json(voucher))
}

/// PATCH /api/v1/voucher/:voucher_id (admin)
async fn update_voucher(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(voucher_id): Path<Uuid>,
    Json(body): Json<UpdateVoucherRequest>,
) -> SalonResult<Json<Voucher>> {
    auth.require_admin()?;
    validate_request(&body)?;

    let current = vouchers::find_by_id(&state.db.pg, voucher_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Voucher"))?;

    // Validate the merged result, not just the patch.
    check_voucher_terms(
        body.discount_type.unwrap_or(current.discount_type),
        body.value.unwrap_or(current.value),
        body.valid_from.or(current.valid_from),
        body.valid_until.or(current.valid_until),
    )?;

    let updated = vouchers::update_voucher(&state.db.pg, voucher_id, &body).await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/voucher/:voucher_id (admin)
async fn delete_voucher(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Path(voucher_id): Path<Uuid>,
) -> SalonResult<Json<serde_json::Value>> {
    auth.require_admin()?;

    if !vouchers::soft_delete(&state.db.pg, voucher_id).await? {
        return Err(SalonError::not_found("Voucher"));
    }
    Ok(Json(serde_json::json!({ "status": true })))
}

/// GET /api/v1/voucher/validate/:code?service_id=..
///
/// Quote what a service would cost with this voucher. Nothing is redeemed.
async fn validate_voucher(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<VoucherQuoteQuery>,
) -> SalonResult<Json<PriceQuote>> {
    let voucher = vouchers::find_by_code(&state.db.pg, &normalize_code(&code))
        .await?
        .ok_or_else(|| SalonError::not_found("Voucher"))?;
    voucher.check_redeemable(Utc::now())?;

    let service = services::find_by_id(&state.db.pg, query.service_id)
        .await?
        .ok_or_else(|| SalonError::not_found("Service"))?;

    Ok(Json(pricing::quote(
        service.price,
        service.discount_percent,
        Some(&voucher),
    )))
}
