//! # Report pipeline
//! Two sequential backend calls produce one [`AgentReport`]:
//!
//! 1. **Discovery** – short structured output (subject, key facts, one post)
//!    plus grounding citations. The partial report is emitted through the
//!    [`ProgressNotifier`] before anything else happens.
//! 2. **Writing** – the long-form body, prompted with the discovery facts so it
//!    cannot contradict them. Citations of both stages are merged.
//!
//! Any failure ends the run; there is no retry and no partial result.

use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::backend::{DynBackend, GenerationRequest, GenerationResponse};
use crate::error::ReportError;
use crate::parse::{self, PayloadError};
use crate::progress::{ProgressNotifier, ProgressSnapshot, Stage};
use crate::prompts::{self, BriefingTarget};
use crate::report::AgentReport;
use crate::sources::{extract_sources, merge_sources, MAX_SOURCES};

/// Run lifecycle. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Discovering,
    DiscoveryParsed,
    Writing,
    WritingParsed,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }

    fn successor(self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Idle => Some(Discovering),
            Discovering => Some(DiscoveryParsed),
            DiscoveryParsed => Some(Writing),
            Writing => Some(WritingParsed),
            WritingParsed => Some(Complete),
            Complete | Failed => None,
        }
    }
}

/// Per-run state holder; only forward transitions are legal.
#[derive(Debug)]
struct RunTracker {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    fn advance(&mut self, to: PipelineState) {
        debug_assert_eq!(self.state.successor(), Some(to), "illegal transition");
        debug!(target: "pipeline", from = ?self.state, to = ?to, "transition");
        self.state = to;
        self.history.push(to);
    }

    fn fail(&mut self) {
        if !self.state.is_terminal() {
            debug!(target: "pipeline", from = ?self.state, "transition to Failed");
            self.state = PipelineState::Failed;
            self.history.push(PipelineState::Failed);
        }
    }
}

pub type Clock = fn() -> DateTime<Utc>;

pub struct ReportPipeline {
    backend: DynBackend,
    target: BriefingTarget,
    clock: Clock,
}

impl ReportPipeline {
    pub fn new(backend: DynBackend, target: BriefingTarget) -> Self {
        Self {
            backend,
            target,
            clock: Utc::now,
        }
    }

    /// Override the time source used for prompts and `generated_at`.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn target(&self) -> &BriefingTarget {
        &self.target
    }

    /// Produce one report. The notifier fires at most once, after discovery
    /// and before writing starts.
    pub async fn generate_report(
        &self,
        notifier: ProgressNotifier,
    ) -> Result<AgentReport, ReportError> {
        let started = Instant::now();
        counter!("briefing_runs_total").increment(1);
        let mut tracker = RunTracker::new();

        match self.run(&mut tracker, notifier).await {
            Ok(report) => {
                histogram!("briefing_run_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
                counter!("briefing_sources_total").increment(report.sources.len() as u64);
                info!(
                    target: "pipeline",
                    backend = self.backend.name(),
                    facts = report.key_facts.len(),
                    sources = report.sources.len(),
                    tweet = report.tweet.is_some(),
                    "report complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracker.fail();
                counter!("briefing_runs_failed_total", "kind" => e.kind()).increment(1);
                warn!(
                    target: "pipeline",
                    error = %e,
                    kind = e.kind(),
                    path = ?tracker.history,
                    "report run failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        tracker: &mut RunTracker,
        mut notifier: ProgressNotifier,
    ) -> Result<AgentReport, ReportError> {
        self.backend.check_credentials()?;
        let now = (self.clock)();

        // --- Discovery ---
        tracker.advance(PipelineState::Discovering);
        let request = prompts::discovery_request(&self.target, now);
        let (text, response) = self.call(&request).await?;
        let discovery = parse::parse_discovery(&text)
            .map_err(|e| payload_error(Stage::Discovery, e))?;
        let discovery_sources = extract_sources(&response.citations);
        tracker.advance(PipelineState::DiscoveryParsed);

        let tweet = discovery.tweet.clone().into_present();
        let partial = AgentReport::partial(
            now,
            discovery.subject.clone(),
            discovery.key_facts.clone(),
            tweet.clone(),
            discovery_sources.clone(),
        );
        notifier.notify(ProgressSnapshot::writing(partial));

        // --- Writing ---
        tracker.advance(PipelineState::Writing);
        let request =
            prompts::writing_request(&self.target, now, &discovery.key_facts, &discovery.tweet);
        let (text, response) = self.call(&request).await?;
        let writing =
            parse::parse_writing(&text).map_err(|e| payload_error(Stage::Writing, e))?;
        let writing_sources = extract_sources(&response.citations);
        tracker.advance(PipelineState::WritingParsed);

        let sources = merge_sources(&discovery_sources, &writing_sources, MAX_SOURCES);
        tracker.advance(PipelineState::Complete);

        Ok(AgentReport {
            generated_at: (self.clock)(),
            subject: discovery.subject,
            body: writing.body,
            key_facts: discovery.key_facts,
            tweet,
            sources,
        })
    }

    /// One backend call; returns the non-empty text alongside the response.
    async fn call(
        &self,
        request: &GenerationRequest,
    ) -> Result<(String, GenerationResponse), ReportError> {
        let stage = request.stage;
        let t0 = Instant::now();
        let result = self.backend.generate(request).await;
        histogram!("briefing_stage_ms", "stage" => stage.as_str())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        let mut response = result.map_err(|e| ReportError::Backend {
            stage,
            reason: format!("{e:#}"),
        })?;
        let text = match response.text.take() {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(ReportError::EmptyResponse { stage }),
        };
        debug!(
            target: "pipeline",
            stage = %stage,
            chars = text.len(),
            citations = response.citations.len(),
            "backend responded"
        );
        Ok((text, response))
    }
}

fn payload_error(stage: Stage, e: PayloadError) -> ReportError {
    if e.is_schema() {
        ReportError::Schema {
            stage,
            detail: e.to_string(),
        }
    } else {
        ReportError::Parse {
            stage,
            reason: e.to_string(),
        }
    }
}
