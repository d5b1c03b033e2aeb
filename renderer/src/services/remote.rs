//! Remote-offload renderer client
//!
//! Forwards render requests over HTTP to a render host running the same
//! service elsewhere, instead of a local worker process. Implements
//! [`Renderer`], so it wraps in a [`crate::Lifetime`] exactly like the
//! local session.

use std::time::Duration;

use crate::config::{LifetimeConfig, RemoteConfig};
use crate::error::{RendererError, RendererResult};
use crate::traits::Renderer;
use crate::types::{RenderRequest, RenderResponse};

pub struct RemoteRenderer {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl RemoteRenderer {
    pub fn new(config: RemoteConfig) -> RendererResult<Self> {
        if config.url.is_empty() {
            return Err(RendererError::configuration(
                "no remote render host URL configured",
            ));
        }
        reqwest::Url::parse(&config.url).map_err(|error| {
            RendererError::configuration(format!("invalid remote URL {}: {error}", config.url))
        })?;
        if !config.request_timeout_sec.is_finite() || config.request_timeout_sec <= 0.0 {
            return Err(RendererError::configuration(
                "request_timeout_sec must be positive",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| RendererError::configuration(error.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn post(&self, request: &RenderRequest) -> RendererResult<RenderResponse> {
        let mut call = self.client.post(&self.config.url).json(request);
        if let Some(api_key) = self.config.api_key.as_deref() {
            call = call.header("x-api-key", api_key);
        }

        let started = std::time::Instant::now();
        let response = call
            .send()
            .await
            .map_err(|error| RendererError::remote(error.to_string()))?;
        tracing::debug!(elapsed = ?started.elapsed(), status = %response.status(), "remote render host replied");

        let status = response.status();
        if !status.is_success() {
            // the host reports validation and internal failures as JSON
            // bodies with message/ex fields
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("ex")
                .or_else(|| body.get("message"))
                .and_then(|value| value.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("unexpected status {status} from remote render host"));
            return Err(RendererError::remote(message));
        }

        response
            .json::<RenderResponse>()
            .await
            .map_err(|error| RendererError::remote(format!("undecodable response body: {error}")))
    }
}

#[async_trait::async_trait]
impl Renderer for RemoteRenderer {
    async fn render(&self, request: &RenderRequest) -> RenderResponse {
        match self.post(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, url = %request.url, "remote render call failed");
                RenderResponse::failure(request, error)
            }
        }
    }

    /// The process being retired lives on the remote host; there is nothing
    /// to stop locally.
    async fn shutdown(&self, _timeout: Option<Duration>) {}

    fn lifetime_config(&self) -> LifetimeConfig {
        self.config.lifetime
    }
}
