use anonymizer_core::ServerDeps;
use axum::{routing::{get, post}, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::rest::{iot, user};

pub const API_PREFIX: &str = "/ipt_anonymizer/api/v1";

pub fn build_router(deps: Arc<ServerDeps>) -> Router {
    let pool = deps.pool().clone();
    let allowed_origins = deps.file_config.server.allowed_origins.clone();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health))
        .nest(API_PREFIX, api_routes())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .with_state(AppState { pool })
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/user/store", post(user::store))
        .route("/user/extract", post(user::extract))
        .route("/iot/store", post(iot::store))
        .route("/iot/extract", post(iot::extract))
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

async fn health() -> &'static str {
    "ok"
}
