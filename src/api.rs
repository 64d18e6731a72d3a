//! HTTP surface: trigger runs, read the current (partial or final) report,
//! check whether a run is due and download the export.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::ReportError;
use crate::export::{ExportRenderer, TextRenderer};
use crate::pipeline::ReportPipeline;
use crate::progress::{ProgressNotifier, Stage};
use crate::report::AgentReport;
use crate::schedule::{is_due, next_run_at, AgentStatus, LastRunStore};

/// Shown on any failed run; details only go to the log.
pub const RUN_FAILED_MESSAGE: &str =
    "Unable to retrieve intelligence. Please check your network connection and API key configuration.";

#[derive(Debug, Clone)]
pub struct ViewState {
    pub status: AgentStatus,
    pub report: Option<AgentReport>,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ReportPipeline>,
    view: Arc<RwLock<ViewState>>,
    last_run: Arc<LastRunStore>,
    renderer: Arc<dyn ExportRenderer>,
    running: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(pipeline: ReportPipeline, last_run: LastRunStore) -> Self {
        let view = ViewState {
            status: AgentStatus::Idle,
            report: None,
            last_run: last_run.load(),
        };
        let renderer = TextRenderer::for_subject(&pipeline.target().subject);
        Self {
            pipeline: Arc::new(pipeline),
            view: Arc::new(RwLock::new(view)),
            last_run: Arc::new(last_run),
            renderer: Arc::new(renderer),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_renderer<R: ExportRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn view(&self) -> ViewState {
        self.view.read().expect("rwlock poisoned").clone()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status))
        .route("/report", get(current_report))
        .route("/report/export", get(export_report))
        .route("/run", post(run_agent))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOut {
    status: AgentStatus,
    running: bool,
    last_run: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    due: bool,
    subject: String,
    topics: Vec<String>,
}

async fn status(State(state): State<AppState>) -> Json<StatusOut> {
    let view = state.view();
    let target = state.pipeline.target();
    Json(StatusOut {
        status: view.status,
        running: view.status.is_running(),
        last_run: view.last_run,
        next_run_at: next_run_at(view.last_run),
        due: is_due(Utc::now(), view.last_run),
        subject: target.subject.clone(),
        topics: target.topics.clone(),
    })
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportOut {
    status: AgentStatus,
    is_writing: bool,
    report: Option<AgentReport>,
}

async fn current_report(State(state): State<AppState>) -> Json<ReportOut> {
    let view = state.view();
    Json(ReportOut {
        status: view.status,
        is_writing: view.status == AgentStatus::Summarizing,
        report: view.report,
    })
}

/// Clears the in-flight flag however the run exits.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(serde::Serialize)]
struct ErrorOut<'a> {
    error: &'a str,
}

async fn run_agent(State(state): State<AppState>) -> Response {
    if state.running.swap(true, Ordering::SeqCst) {
        return (
            StatusCode::CONFLICT,
            Json(ErrorOut {
                error: "a run is already in progress",
            }),
        )
            .into_response();
    }
    let guard = RunGuard(state.running.clone());

    // The run lives in its own task so a dropped connection cannot abandon it
    // halfway; the handler only waits for the outcome.
    let task = tokio::spawn(async move {
        let _guard = guard;
        execute_run(&state).await
    });

    match task.await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorOut {
                error: RUN_FAILED_MESSAGE,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "run task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorOut {
                    error: RUN_FAILED_MESSAGE,
                }),
            )
                .into_response()
        }
    }
}

/// One full run against the shared view: reset, partial update, final state.
async fn execute_run(state: &AppState) -> Result<AgentReport, ReportError> {
    {
        let mut v = state.view.write().expect("rwlock poisoned");
        v.status = AgentStatus::Searching;
        v.report = None;
    }

    let view = state.view.clone();
    let notifier = ProgressNotifier::from_fn(move |snapshot| {
        if snapshot.stage != Stage::Writing {
            return;
        }
        let mut v = view.write().expect("rwlock poisoned");
        v.status = AgentStatus::Summarizing;
        if let Some(partial) = snapshot.partial_report {
            v.report = Some(partial);
        }
    });

    match state.pipeline.generate_report(notifier).await {
        Ok(report) => {
            let now = Utc::now();
            if let Err(e) = state.last_run.save(now) {
                warn!(error = ?e, "failed to persist last-run marker");
            }
            {
                let mut v = state.view.write().expect("rwlock poisoned");
                v.status = AgentStatus::Complete;
                v.report = Some(report.clone());
                v.last_run = Some(now);
            }
            info!(sources = report.sources.len(), "run finished");
            Ok(report)
        }
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "run failed");
            // Any partial report stays visible.
            state.view.write().expect("rwlock poisoned").status = AgentStatus::Error;
            Err(e)
        }
    }
}

async fn export_report(State(state): State<AppState>) -> Response {
    let report = match state.view().report {
        Some(r) if r.has_body() => r,
        _ => return (StatusCode::NOT_FOUND, "no finished report to export").into_response(),
    };
    match state.renderer.render(&report) {
        Ok(doc) => (
            [
                (header::CONTENT_TYPE, doc.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", doc.filename),
                ),
            ],
            doc.to_text(),
        )
            .into_response(),
        Err(e) => {
            warn!(error = ?e, "export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "export failed").into_response()
        }
    }
}
