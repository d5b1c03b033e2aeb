//! HTTP routing

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use renderer::traits::Renderer;

use crate::state::AppState;

/// Build the service router over any renderer implementation.
pub fn router<R: Renderer + 'static>(state: Arc<AppState<R>>) -> Router {
    Router::new()
        .route("/render", post(handlers::render::<R>))
        .route("/health", get(handlers::health::<R>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
