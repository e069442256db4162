//! HTTP router for lambdastub

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use lambdastub_invoke::InvokeState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the main application router
pub fn create_router(state: Arc<InvokeState>) -> Router {
    let health = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    health
        .merge(lambdastub_invoke::router(state))
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<Arc<InvokeState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "running",
            "region": state.service.resolver().region(),
            "functions": state.service.registry().names(),
        })),
    )
}
