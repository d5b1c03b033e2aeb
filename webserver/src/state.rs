//! Shared application state for the HTTP layer

use std::sync::Arc;

use chrono::{DateTime, Utc};
use renderer::traits::Renderer;

/// State handed to every handler. Generic over the renderer so the front
/// door serves a supervised local session, a remote-offload client, or a
/// test double identically.
pub struct AppState<R: Renderer> {
    pub renderer: Arc<R>,
    pub started_at: DateTime<Utc>,
}

impl<R: Renderer> AppState<R> {
    pub fn new(renderer: Arc<R>) -> Self {
        Self {
            renderer,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
