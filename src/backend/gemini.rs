// src/backend/gemini.rs
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerationRequest, GenerationResponse, GenerativeBackend, GroundingChunk};
use crate::config::AgentConfig;
use crate::error::ReportError;

/// Gemini `generateContent` over REST. Requires an API key (see `AgentConfig`).
pub struct GeminiBackend {
    http: reqwest::Client,
    /// Resolved once at construction; a missing key surfaces on the first run.
    api_key: Result<String, ReportError>,
    model: String,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(cfg: &AgentConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("briefing-agent/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            api_key: cfg.require_api_key().map(str::to_string),
            model: cfg.model.clone(),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

fn build_body(request: &GenerationRequest) -> Req<'_> {
    let tools = if request.use_search {
        vec![Tool {
            google_search: Value::Object(Default::default()),
        }]
    } else {
        Vec::new()
    };
    Req {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        tools,
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.response_schema,
        },
    }
}

/// First candidate only. Text parts are concatenated; no text at all yields `None`.
fn into_response(body: Resp) -> GenerationResponse {
    let Some(first) = body.candidates.into_iter().next() else {
        return GenerationResponse::default();
    };
    let text: String = first
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    GenerationResponse {
        text: if text.is_empty() { None } else { Some(text) },
        citations: first
            .grounding_metadata
            .map(|g| g.grounding_chunks)
            .unwrap_or_default(),
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse> {
        let key = self.api_key.as_ref().map_err(|e| anyhow!("{e}"))?;
        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&build_body(request))
            .send()
            .await
            .context("gemini request")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(300).collect();
            return Err(anyhow!("gemini HTTP {status}: {detail}"));
        }
        let body: Resp = resp.json().await.context("decoding gemini response")?;
        Ok(into_response(body))
    }

    fn check_credentials(&self) -> Result<(), ReportError> {
        self.api_key.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Stage;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let req = GenerationRequest {
            stage: Stage::Discovery,
            prompt: "hi".into(),
            response_schema: json!({"type": "OBJECT"}),
            use_search: true,
        };
        let v = serde_json::to_value(build_body(&req)).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(v["tools"][0]["googleSearch"], json!({}));
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");

        let no_search = GenerationRequest {
            use_search: false,
            ..req
        };
        let v = serde_json::to_value(build_body(&no_search)).unwrap();
        assert!(v.get("tools").is_none());
    }

    #[test]
    fn response_text_and_citations() {
        let raw = json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"body\":"}, {"text": "\"x\"}"}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.com", "title": "A"}},
                    {"retrievedContext": {}}
                ]}
            }]
        });
        let out = into_response(serde_json::from_value(raw).unwrap());
        assert_eq!(out.text.as_deref(), Some("{\"body\":\"x\"}"));
        assert_eq!(out.citations.len(), 2);
        assert!(out.citations[1].web.is_none());
    }

    #[test]
    fn empty_candidates_mean_no_text() {
        let out = into_response(serde_json::from_value(json!({})).unwrap());
        assert!(out.text.is_none());
        assert!(out.citations.is_empty());
    }

    #[test]
    fn blank_key_is_configuration_error() {
        let cfg = AgentConfig {
            api_key: String::new(),
            ..AgentConfig::default()
        };
        let b = GeminiBackend::new(&cfg).unwrap();
        assert!(matches!(
            b.check_credentials(),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    fn literal_key_passes_credential_check() {
        let cfg = AgentConfig {
            api_key: "  lit-key ".into(),
            ..AgentConfig::default()
        };
        let b = GeminiBackend::new(&cfg).unwrap();
        assert!(b.check_credentials().is_ok());
        assert_eq!(b.api_key.as_deref().ok(), Some("lit-key"));
    }
}
