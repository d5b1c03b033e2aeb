//! REST API handlers
//!
//! The render endpoint validates every request before the core ever sees
//! it; the core itself never receives a malformed request from this layer.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use renderer::traits::Renderer;
use renderer::types::{RenderRequest, RenderResponse};

use crate::state::AppState;

/// Largest accepted viewport edge, in pixels.
const MAX_DIMENSION: u32 = 10_000;

/// Render a page. `POST /render`
pub async fn render<R>(
    State(state): State<Arc<AppState<R>>>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, (StatusCode, Json<Value>)>
where
    R: Renderer + 'static,
{
    if let Err(reason) = validate(&request) {
        tracing::warn!(url = %request.url, %reason, "rejecting render request");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Failed request validation",
                "ex": reason,
            })),
        ));
    }

    Ok(Json(state.renderer.render(&request).await))
}

/// Service liveness and uptime. `GET /health`
pub async fn health<R>(State(state): State<Arc<AppState<R>>>) -> Json<Value>
where
    R: Renderer + 'static,
{
    Json(json!({
        "status": "ok",
        "data": {
            "server_status": "running",
            "uptime_seconds": state.uptime_seconds(),
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}

fn validate(request: &RenderRequest) -> Result<(), String> {
    if request.url.trim().is_empty() {
        return Err("url must not be empty".to_string());
    }
    url::Url::parse(&request.url)
        .map_err(|error| format!("url is not an absolute URL: {error}"))?;

    if request.width == 0 || request.width > MAX_DIMENSION {
        return Err(format!("width must be in 1..={MAX_DIMENSION}"));
    }
    if request.height == 0 || request.height > MAX_DIMENSION {
        return Err(format!("height must be in 1..={MAX_DIMENSION}"));
    }

    if let Some(timeout) = request.page_load_timeout {
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err("page_load_timeout must be a positive number of seconds".to_string());
        }
    }

    Ok(())
}
