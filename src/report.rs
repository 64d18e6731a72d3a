//! # Report model
//! Value types that make up one briefing: the aggregate [`AgentReport`],
//! the optional [`TweetHighlight`] and the [`NewsSource`] evidence list.
//!
//! Field names serialize in camelCase so the JSON served by the API keeps the
//! shape the presentation layer already consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One evidence citation. Identity is the exact `uri`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsSource {
    pub title: String,
    pub uri: String,
}

/// The single highlighted post attached to a briefing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TweetHighlight {
    pub text: String,
    pub url: String,
    /// Rough relative time as reported by the backend, e.g. "2h ago".
    pub date: String,
}

impl TweetHighlight {
    /// A highlight without text carries nothing worth showing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Blank highlights become `None`; the backend must always return one.
    pub fn into_present(self) -> Option<Self> {
        if self.is_blank() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    pub generated_at: DateTime<Utc>,
    pub subject: String,
    /// Long-form narrative; empty until the writing stage completes.
    pub body: String,
    pub key_facts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<TweetHighlight>,
    pub sources: Vec<NewsSource>,
}

impl AgentReport {
    /// Report as known after discovery: everything but the body.
    pub fn partial(
        generated_at: DateTime<Utc>,
        subject: String,
        key_facts: Vec<String>,
        tweet: Option<TweetHighlight>,
        sources: Vec<NewsSource>,
    ) -> Self {
        Self {
            generated_at,
            subject,
            body: String::new(),
            key_facts,
            tweet,
            sources,
        }
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    pub fn has_tweet(&self) -> bool {
        self.tweet.as_ref().is_some_and(|t| !t.is_blank())
    }
}
