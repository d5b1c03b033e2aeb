//! Renderer capability trait with mockall annotations for testing
//!
//! The lifecycle supervisor and the HTTP layer are written against this
//! trait, so any conforming implementation (the local worker-process
//! session, the remote-offload client, or a generated mock) can be wrapped
//! uniformly.

use std::time::Duration;

use crate::config::LifetimeConfig;
use crate::types::{RenderRequest, RenderResponse};

/// A component that can turn a [`RenderRequest`] into a [`RenderResponse`].
///
/// `render` is total: every failure mode resolves to a response with
/// `status = fail` and a populated `error`; implementations never panic or
/// return an error value from a render call.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render one request. Exactly one response is produced per call.
    async fn render(&self, request: &RenderRequest) -> RenderResponse;

    /// Shut down and clean up the renderer.
    ///
    /// # Parameters
    /// - `timeout`: bound on how long to wait for a graceful stop before
    ///   degrading to forced termination; `None` waits as long as it takes.
    ///
    /// Safe to call when already shut down, and idempotent.
    async fn shutdown(&self, timeout: Option<Duration>);

    /// Lifecycle thresholds the supervisor should apply when wrapping this
    /// renderer.
    fn lifetime_config(&self) -> LifetimeConfig;
}
