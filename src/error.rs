// src/error.rs
use thiserror::Error;

use crate::progress::Stage;

/// Every way a pipeline run can fail. All variants are terminal for the run;
/// nothing is retried.
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("no response text from {stage} stage")]
    EmptyResponse { stage: Stage },

    #[error("failed to parse {stage} JSON: {reason}")]
    Parse { stage: Stage, reason: String },

    #[error("{stage} payload violates schema: {detail}")]
    Schema { stage: Stage, detail: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("backend request failed during {stage}: {reason}")]
    Backend { stage: Stage, reason: String },
}

impl ReportError {
    /// Stable short label for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::EmptyResponse { .. } => "empty-response",
            ReportError::Parse { .. } => "parse",
            ReportError::Schema { .. } => "schema",
            ReportError::Configuration(_) => "configuration",
            ReportError::Backend { .. } => "backend",
        }
    }

    /// Stage the failure happened in; configuration errors precede both stages.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ReportError::EmptyResponse { stage }
            | ReportError::Parse { stage, .. }
            | ReportError::Schema { stage, .. }
            | ReportError::Backend { stage, .. } => Some(*stage),
            ReportError::Configuration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_stage() {
        let e = ReportError::EmptyResponse {
            stage: Stage::Discovery,
        };
        assert_eq!(e.to_string(), "no response text from discovery stage");
        assert_eq!(e.kind(), "empty-response");
        assert_eq!(e.stage(), Some(Stage::Discovery));
        assert_eq!(ReportError::Configuration("x".into()).stage(), None);
    }
}
