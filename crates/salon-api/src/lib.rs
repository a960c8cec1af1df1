//! # salon-api
//!
//! REST API for the booking backend: accounts, catalog, the appointment
//! queue, payments and reporting.

pub mod auth;
pub mod mailer;
pub mod middleware;
pub mod payments;
pub mod routes;

use axum::Router;
use salon_common::gateway_event::GatewayEvent;
use salon_common::scheduling::WorkingWindow;
use salon_db::{Database, storage::ImageStore};
use std::{sync::Arc, time::Instant};
use tokio::sync::broadcast;

use crate::{mailer::Mailer, payments::PaymentClient};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Broadcast sender to push appointment events to the WebSocket gateway.
    pub gateway_tx: broadcast::Sender<GatewayEvent>,
    /// Bucket behind profile, branch, aesthetician and service images.
    pub images: ImageStore,
    /// Invoice provider client.
    pub payments: PaymentClient,
    /// None when SMTP isn't configured; mail is then skipped.
    pub mailer: Option<Mailer>,
    /// Bookable hours of every branch.
    pub window: WorkingWindow,
    /// Process start, reported by the health check.
    pub started_at: Instant,
}

impl AppState {
    /// Publish an event; having no connected gateway sessions is not an error.
    pub fn broadcast(&self, event: GatewayEvent) {
        let kind = event.event_type;
        if self.gateway_tx.send(event).is_err() {
            tracing::trace!(event = %kind, "No gateway subscribers");
        }
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::walk_ins::router())
        .merge(routes::branches::router())
        .merge(routes::aestheticians::router())
        .merge(routes::services::router())
        .merge(routes::vouchers::router())
        .merge(routes::appointments::router())
        .merge(routes::payments::router())
        .merge(routes::analytics::router())
        .merge(routes::health::router());

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(Arc::new(state))
}
