//! Reporting endpoints (admin).
//!
//! Every report takes the same `?from&to&branch_id` scope; when omitted the
//! range is the 30 days ending today in salon time.

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware,
    routing::get,
};
use salon_common::{
    error::SalonResult,
    models::analytics::{
        AestheticianStat, AnalyticsQuery, BranchStat, CustomerMix, HourCount, ReportRange,
        RevenueBucket, ServiceStat, StatusCount, Summary, VoucherStat,
    },
};
use salon_db::repository::analytics;
use serde::Serialize;
use std::sync::Arc;

use crate::{AppState, middleware::AuthContext};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/summary", get(summary))
        .route("/analytics/revenue", get(revenue))
        .route("/analytics/status-breakdown", get(status_breakdown))
        .route("/analytics/top-services", get(top_services))
        .route("/analytics/branch-performance", get(branch_performance))
        .route("/analytics/aesthetician-performance", get(aesthetician_performance))
        .route("/analytics/peak-hours", get(peak_hours))
        .route("/analytics/customer-mix", get(customer_mix))
        .route("/analytics/voucher-usage", get(voucher_usage))
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// Report payload with the range it covers.
#[derive(Serialize)]
struct Report<T> {
    range: ReportRange,
    data: T,
}

/// Admin gate plus range resolution shared by every report.
fn scope(auth: &AuthContext, query: &AnalyticsQuery) -> SalonResult<ReportRange> {
    auth.require_admin()?;
    query.range(salon_common::config::get().schedule.local_now().date())
}

async fn summary(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Summary>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::summary(&state.db.pg, &range).await?;
    Ok(Json(Report { range, data }))
}

/// `?interval=day|month`
async fn revenue(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<RevenueBucket>>>> {
    let range = scope(&auth, &query)?;
    let data =
        analytics::revenue(&state.db.pg, &range, query.interval.unwrap_or_default()).await?;
    Ok(Json(Report { range, data }))
}

async fn status_breakdown(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<StatusCount>>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::status_breakdown(&state.db.pg, &range).await?;
    Ok(Json(Report { range, data }))
}

async fn top_services(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<ServiceStat>>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::top_services(&state.db.pg, &range, query.top_limit()).await?;
    Ok(Json(Report { range, data }))
}

async fn branch_performance(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<BranchStat>>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::branch_performance(&state.db.pg, &range).await?;
    Ok(Json(Report { range, data }))
}

async fn aesthetician_performance(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<AestheticianStat>>>> {
    let range = scope(&auth, &query)?;
    let data =
        analytics::aesthetician_performance(&state.db.pg, &range, query.top_limit()).await?;
    Ok(Json(Report { range, data }))
}

async fn peak_hours(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<HourCount>>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::peak_hours(&state.db.pg, &range).await?;
    Ok(Json(Report { range, data }))
}

async fn customer_mix(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<CustomerMix>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::customer_mix(&state.db.pg, &range).await?;
    Ok(Json(Report { range, data }))
}

async fn voucher_usage(
    Extension(auth): Extension<AuthContext>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> SalonResult<Json<Report<Vec<VoucherStat>>>> {
    let range = scope(&auth, &query)?;
    let data = analytics::voucher_usage(&state.db.pg, &range).await?;
    Ok(Json(Report { range, data }))
}
