pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod services;

use axum::{middleware::from_fn, routing::get, Router};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::MarketplaceConfig;
use crate::services::{FederationService, Store};

#[derive(Clone)]
pub struct AppState {
    pub config: MarketplaceConfig,
    pub store: Arc<dyn Store>,
    pub federation: FederationService,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/auth/sign-in", get(handlers::auth::sign_in))
        .route("/auth/callback", get(handlers::auth::callback))
        .route("/auth/sign-out", get(handlers::auth::sign_out))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                // Path only: callback query strings carry authorization codes.
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}
