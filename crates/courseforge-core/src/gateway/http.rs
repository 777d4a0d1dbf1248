//! HTTP implementation of [`GenerationGateway`] backed by the remote
//! generation service.
//!
//! Both endpoints speak JSON over POST and wrap their payloads in the
//! uniform [`ApiEnvelope`]. Error responses follow the service's convention
//! of a JSON body with a `detail` field; when present, that text is
//! preferred over the bare HTTP status for user-facing messages.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::{CourseOutline, ModuleDetail};

use super::{ApiEnvelope, DetailRequest, GatewayError, GenerationGateway, OutlineRequest};

const OUTLINE_PATH: &str = "/api/generate-outline";
const DETAIL_PATH: &str = "/api/generate-detail";
const HEALTH_PATH: &str = "/health";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Connection settings for the generation service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the service (scheme + host + port, no trailing path).
    pub base_url: String,
    /// Upper bound on each request/response round trip.
    pub timeout: Duration,
}

impl GatewayConfig {
    /// The default service URL used when nothing else is configured.
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

    /// Default per-request wait bound. Generation calls are slow; the
    /// service itself may take a minute or more per outline.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Build a config with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Build a config from the environment.
    ///
    /// Priority: `COURSEFORGE_API_URL` env var, then the compile-time
    /// default.
    pub fn from_env() -> Self {
        let base_url = env::var("COURSEFORGE_API_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned());
        Self::new(base_url)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// Error body shape used by the service for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub config_valid: bool,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Production [`GenerationGateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGenerationGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGenerationGateway {
    /// Build a gateway from a config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be
    /// constructed (e.g. no TLS backend available).
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Query the service health endpoint.
    ///
    /// Operational convenience only; not part of the workflow contract.
    pub async fn health(&self) -> Result<HealthStatus, GatewayError> {
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(GatewayError::Remote(format!(
                "health check failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed health response: {e}")))
    }

    /// POST a generation request and unwrap the response envelope.
    async fn post_generate<Req, T>(&self, path: &str, body: &Req) -> Result<T, GatewayError>
    where
        Req: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, timeout_secs = self.config.timeout.as_secs(), "calling generation service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            // The service reports failures as JSON bodies with a `detail`
            // field; prefer that text when it is present.
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.detail)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(GatewayError::Remote(message));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("malformed response body: {e}")))?;

        match envelope {
            ApiEnvelope {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            ApiEnvelope { error, message, .. } => {
                let detail = error
                    .filter(|e| !e.is_empty())
                    .or_else(|| (!message.is_empty()).then_some(message))
                    .unwrap_or_else(|| "generation failed without detail".to_owned());
                Err(GatewayError::Remote(detail))
            }
        }
    }

    fn map_send_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.config.timeout)
        } else {
            GatewayError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn generate_outline(
        &self,
        request: &OutlineRequest,
    ) -> Result<CourseOutline, GatewayError> {
        debug!(
            content_len = request.textbook_content.len(),
            module_count = request.module_count,
            "requesting outline generation"
        );
        self.post_generate(OUTLINE_PATH, request).await
    }

    async fn generate_detail(
        &self,
        request: &DetailRequest,
    ) -> Result<ModuleDetail, GatewayError> {
        debug!(
            module_id = %request.module_info.module_id,
            detail_level = %request.detail_level,
            exercise_count = request.exercise_count,
            "requesting detail generation"
        );
        self.post_generate(DETAIL_PATH, request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
