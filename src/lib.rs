// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod schedule;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::error::ReportError;
pub use crate::pipeline::ReportPipeline;
pub use crate::progress::{ProgressNotifier, ProgressSnapshot, Stage};
pub use crate::report::{AgentReport, NewsSource, TweetHighlight};

use axum::Router;
use tracing::info;

/// Build the full application router from `config/agent.json` (or
/// `$AGENT_CONFIG_PATH`) and the environment. Adds `/metrics` when the
/// Prometheus recorder could be installed.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = config::AgentConfig::load_default()?;
    // Safe diagnostics: only subject + model + key length
    info!(
        "agent cfg loaded: subject={}, model={}, key_len={}",
        cfg.subject,
        cfg.model,
        cfg.api_key.len()
    );
    let backend = backend::build_backend(&cfg)?;
    let pipeline = ReportPipeline::new(backend, prompts::BriefingTarget::from(&cfg));
    let state = api::AppState::new(pipeline, schedule::LastRunStore::new(&cfg.last_run_path));

    let mut router = api::create_router(state);
    if let Some(m) = crate::metrics::global() {
        router = router.merge(m.router());
    }
    Ok(router)
}
