// src/backend/scripted.rs
use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;

use super::{GenerationRequest, GenerationResponse, GenerativeBackend};
use crate::config::AgentConfig;
use crate::error::ReportError;
use crate::progress::Stage;

/// Replays canned responses in order and records every request it receives.
/// Running past the end of the script is a backend error.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<GenerationResponse, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    credentials: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            credentials: true,
        }
    }

    pub fn respond(self, response: GenerationResponse) -> Self {
        self.script
            .lock()
            .expect("poisoned script")
            .push_back(Ok(response));
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        self.script
            .lock()
            .expect("poisoned script")
            .push_back(Err(reason.to_string()));
        self
    }

    /// Behave as if no credential were configured.
    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("poisoned requests").clone()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse> {
        self.requests
            .lock()
            .expect("poisoned requests")
            .push(request.clone());
        let next = self.script.lock().expect("poisoned script").pop_front();
        match next {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Err(anyhow!("script exhausted at {} stage", request.stage)),
        }
    }

    fn check_credentials(&self) -> Result<(), ReportError> {
        if self.credentials {
            Ok(())
        } else {
            Err(ReportError::Configuration("API key missing".into()))
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Deterministic offline backend selected by `AI_TEST_MODE=mock`.
#[derive(Debug, Clone)]
pub struct MockBackend {
    subject: String,
    handle: String,
}

impl MockBackend {
    pub fn for_config(cfg: &AgentConfig) -> Self {
        Self {
            subject: cfg.subject.clone(),
            handle: cfg.handle.clone(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationResponse> {
        let payload = match request.stage {
            Stage::Discovery => json!({
                "subject": format!("{} briefing (mock)", self.subject),
                "keyFacts": [
                    format!("{} made no verifiable announcements (mock).", self.subject),
                    "Markets were calm (mock).",
                ],
                "tweet": {
                    "text": "Mock post",
                    "url": format!("https://x.com/{}", self.handle),
                    "date": "1h ago",
                },
            }),
            _ => json!({
                "body": format!("## Highlights\nNothing notable about {} (mock).", self.subject),
            }),
        };
        Ok(GenerationResponse::text(payload.to_string())
            .with_citation(Some("Mock source"), "https://example.test/mock"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
