//! One-shot CLI: run the pipeline once, print the export to stdout and update
//! the last-run marker. Pass `--if-due` to skip when the last run is recent.

use anyhow::Context;
use briefing_agent::backend::build_backend;
use briefing_agent::config::AgentConfig;
use briefing_agent::export::{ExportRenderer, TextRenderer};
use briefing_agent::prompts::BriefingTarget;
use briefing_agent::schedule::{is_due, next_run_at, LastRunStore};
use briefing_agent::{ProgressNotifier, ReportPipeline};
use chrono::Utc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let only_if_due = std::env::args().any(|a| a == "--if-due");
    let cfg = AgentConfig::load_default()?;
    let store = LastRunStore::new(&cfg.last_run_path);
    let last_run = store.load();

    if !is_due(Utc::now(), last_run) {
        if let Some(next) = next_run_at(last_run) {
            eprintln!("not due yet; next run at {}", next.to_rfc3339());
        }
        if only_if_due {
            return Ok(());
        }
    }

    let pipeline = ReportPipeline::new(build_backend(&cfg)?, BriefingTarget::from(&cfg));
    let notifier = ProgressNotifier::from_fn(|snapshot| {
        if let Some(partial) = snapshot.partial_report {
            eprintln!(
                "discovery done: {} facts, {} sources; writing...",
                partial.key_facts.len(),
                partial.sources.len()
            );
        }
    });

    let report = pipeline.generate_report(notifier).await?;
    store.save(Utc::now()).context("saving last-run marker")?;

    let doc = TextRenderer::for_subject(&cfg.subject).render(&report)?;
    println!("{}", doc.to_text());
    eprintln!("suggested filename: {}", doc.filename);
    Ok(())
}
