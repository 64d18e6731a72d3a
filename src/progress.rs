//! # Progress channel
//! Single-shot notification from the pipeline to its caller.
//!
//! A [`ProgressNotifier`] is handed to one pipeline run and fires at most once:
//! `notify` consumes the inner sink, so a second emission is impossible. The
//! sink is either a plain callback (the HTTP layer updates its view state with
//! it) or a `tokio::sync::oneshot` channel for callers that want to await the
//! partial report elsewhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::report::AgentReport;

/// The two backend calls of a run. Only `Writing` is signalled to callers;
/// completion is the pipeline returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Discovery,
    Writing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Writing => "writing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub stage: Stage,
    pub partial_report: Option<AgentReport>,
}

impl ProgressSnapshot {
    /// "Writing has begun, here is what we know so far."
    pub fn writing(partial: AgentReport) -> Self {
        Self {
            stage: Stage::Writing,
            partial_report: Some(partial),
        }
    }
}

type Callback = Box<dyn FnOnce(ProgressSnapshot) + Send + 'static>;

enum Sink {
    Callback(Callback),
    Channel(oneshot::Sender<ProgressSnapshot>),
}

pub struct ProgressNotifier {
    sink: Option<Sink>,
    fired: bool,
}

impl ProgressNotifier {
    /// Notifier that drops every snapshot.
    pub fn silent() -> Self {
        Self {
            sink: None,
            fired: false,
        }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(ProgressSnapshot) + Send + 'static,
    {
        Self {
            sink: Some(Sink::Callback(Box::new(f))),
            fired: false,
        }
    }

    /// Notifier plus the receiving end; the receiver resolves with the
    /// snapshot, or errors if the run ended without emitting one.
    pub fn channel() -> (Self, oneshot::Receiver<ProgressSnapshot>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sink: Some(Sink::Channel(tx)),
                fired: false,
            },
            rx,
        )
    }

    /// Deliver `snapshot` synchronously. Returns `false` if this notifier has
    /// already fired.
    pub fn notify(&mut self, snapshot: ProgressSnapshot) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        match self.sink.take() {
            Some(Sink::Callback(f)) => f(snapshot),
            Some(Sink::Channel(tx)) => {
                if tx.send(snapshot).is_err() {
                    tracing::debug!("progress receiver dropped before emission");
                }
            }
            None => {}
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl fmt::Debug for ProgressNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.sink {
            Some(Sink::Callback(_)) => "callback",
            Some(Sink::Channel(_)) => "channel",
            None => "none",
        };
        f.debug_struct("ProgressNotifier")
            .field("sink", &kind)
            .field("fired", &self.fired)
            .finish()
    }
}
