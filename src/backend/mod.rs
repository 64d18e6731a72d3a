//! Generative-search backend: request/response types and the provider seam.
//!
//! The pipeline only talks to [`GenerativeBackend`]. Production uses
//! [`gemini::GeminiBackend`]; tests and local runs use the scripted and mock
//! providers from [`scripted`].

pub mod gemini;
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AgentConfig;
use crate::error::ReportError;
use crate::progress::Stage;

pub use gemini::GeminiBackend;
pub use scripted::{MockBackend, ScriptedBackend};

/// One structured generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub stage: Stage,
    pub prompt: String,
    /// JSON schema the output must follow (OpenAPI subset, upper-case types).
    pub response_schema: Value,
    /// Allow the backend to ground the answer with web search.
    pub use_search: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Raw model text; `None` when the backend produced nothing.
    pub text: Option<String>,
    #[serde(default)]
    pub citations: Vec<GroundingChunk>,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            citations: Vec::new(),
        }
    }

    pub fn with_citation(mut self, title: Option<&str>, uri: &str) -> Self {
        self.citations.push(GroundingChunk {
            web: Some(WebRef {
                title: title.map(str::to_string),
                uri: Some(uri.to_string()),
            }),
        });
        self
    }
}

/// Citation entry from grounding metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebRef {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse>;

    /// Precondition checked before the first request of a run.
    fn check_credentials(&self) -> Result<(), ReportError> {
        Ok(())
    }

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn GenerativeBackend>;

/// Factory: build a backend according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns the deterministic [`MockBackend`].
/// * Otherwise builds the HTTP [`GeminiBackend`]. A missing key is not an error
///   here; it surfaces as a configuration error when a run starts.
pub fn build_backend(cfg: &AgentConfig) -> anyhow::Result<DynBackend> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        tracing::info!("AI_TEST_MODE=mock, using mock backend");
        return Ok(Arc::new(MockBackend::for_config(cfg)));
    }
    Ok(Arc::new(GeminiBackend::new(cfg)?))
}
