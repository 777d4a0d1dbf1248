//! The generation gateway -- the boundary abstraction for the two remote
//! generation calls.
//!
//! [`GenerationGateway`] is intentionally object-safe so the workflow can
//! hold it as `Arc<dyn GenerationGateway>` and tests can substitute scripted
//! implementations. The production implementation lives in [`http`].

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    CourseModule, CourseOutline, DetailLevel, ModuleDetail, TextbookSubmission,
};

pub use http::{GatewayConfig, HealthStatus, HttpGenerationGateway};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure taxonomy for a single generation round trip.
///
/// None of these are retried automatically; retry is a user-initiated
/// re-trigger of the owning workflow intent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The service reported a logical failure in a well-formed payload,
    /// or returned a payload that violates the contract (e.g. a detail
    /// for a different module than requested).
    #[error("remote generation failed: {0}")]
    Remote(String),

    /// No usable response was received (connection refused, malformed
    /// body, and so on).
    #[error("transport failure: {0}")]
    Transport(String),

    /// No response within the configured wait bound.
    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Human-readable message for session status display.
    ///
    /// Prefers the server-supplied detail text of a [`Self::Remote`]
    /// failure; other variants fall back to their transport-level text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /api/generate-outline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub textbook_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub module_count: u8,
}

impl From<&TextbookSubmission> for OutlineRequest {
    fn from(submission: &TextbookSubmission) -> Self {
        Self {
            textbook_content: submission.content.clone(),
            grade_level: submission.grade_level.clone(),
            subject: submission.subject.clone(),
            module_count: submission.module_count,
        }
    }
}

/// Body of `POST /api/generate-detail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRequest {
    /// The module to expand, passed back to the service verbatim.
    pub module_info: CourseModule,
    /// Carry-over context: the original textbook text from the submission.
    pub textbook_content: String,
    pub detail_level: DetailLevel,
    pub exercise_count: u8,
}

/// Uniform response envelope used by both generation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    // No `default` attribute here: serde already treats a missing Option
    // field as None, and the attribute would impose a `T: Default` bound
    // on the derived impl.
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Typed client for the two remote generation operations.
///
/// Each operation is a single request/response round trip with a fixed
/// upper bound on wait time. Implementations normalize every failure into
/// a [`GatewayError`]; the workflow layer never sees raw transport errors.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate a course outline from a textbook submission.
    async fn generate_outline(
        &self,
        request: &OutlineRequest,
    ) -> Result<CourseOutline, GatewayError>;

    /// Generate the detailed teaching content for one module.
    ///
    /// The returned `ModuleDetail.module_id` is validated by the caller
    /// against the requested module; a mismatch is a contract violation.
    async fn generate_detail(
        &self,
        request: &DetailRequest,
    ) -> Result<ModuleDetail, GatewayError>;
}

// Compile-time assertion: the gateway must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn GenerationGateway) {}
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
