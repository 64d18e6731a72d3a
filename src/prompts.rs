//! Prompt and output-schema builders for the two generation stages.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::backend::GenerationRequest;
use crate::progress::Stage;
use crate::report::TweetHighlight;

/// Who is being monitored and in which language the briefing is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefingTarget {
    pub subject: String,
    pub handle: String,
    pub topics: Vec<String>,
    pub language: String,
}

impl From<&crate::config::AgentConfig> for BriefingTarget {
    fn from(cfg: &crate::config::AgentConfig) -> Self {
        Self {
            subject: cfg.subject.clone(),
            handle: cfg.handle.clone(),
            topics: cfg.topics.clone(),
            language: cfg.language.clone(),
        }
    }
}

/// "Saturday, September 6, 2025"
pub fn long_date(now: DateTime<Utc>) -> String {
    now.format("%A, %B %-d, %Y").to_string()
}

pub fn discovery_schema(target: &BriefingTarget) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "subject": {
                "type": "STRING",
                "description": format!("Neutral {} subject line.", target.language),
            },
            "keyFacts": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": format!("5-7 strictly factual bullet points in {}.", target.language),
            },
            "tweet": {
                "type": "OBJECT",
                "properties": {
                    "text": { "type": "STRING", "description": "The exact content of the post." },
                    "url": {
                        "type": "STRING",
                        "description": format!(
                            "The specific URL to the post (must contain /status/). If not found, use https://x.com/{}",
                            target.handle
                        ),
                    },
                    "date": { "type": "STRING", "description": "Rough relative time, e.g. '2h ago'." }
                },
                "required": ["text", "url", "date"],
                "description": format!("One significant recent post from @{}.", target.handle),
            }
        },
        "required": ["subject", "keyFacts", "tweet"],
    })
}

pub fn writing_schema(target: &BriefingTarget) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "body": {
                "type": "STRING",
                "description": format!("A comprehensive, neutral {} summary. Use Markdown headings.", target.language),
            }
        },
        "required": ["body"],
    })
}

pub fn discovery_request(target: &BriefingTarget, now: DateTime<Utc>) -> GenerationRequest {
    let topics = if target.topics.is_empty() {
        String::new()
    } else {
        format!(" Cover: {}.", target.topics.join(", "))
    };
    let prompt = format!(
        "Current Date: {date}\n\n\
         TASK: Fast discovery of news about {subject} (last 48h).\n\n\
         1. **Search**: Find the latest breaking news about {subject}.{topics}\n\
         2. **POST**: Find the most significant or discussed post by @{handle} in the last 48 hours. \
         If several exist, pick the most relevant one. Return its text and try hard to find the specific link (ending in /status/123...).\n\
         3. **Filter**: Select the 5-7 most important facts.\n\
         4. **Output**: Return the facts, the post and a subject line in {language}.\n\n\
         Strictly neutral. Focus on international accuracy.",
        date = long_date(now),
        subject = target.subject,
        handle = target.handle,
        language = target.language,
    );
    GenerationRequest {
        stage: Stage::Discovery,
        prompt,
        response_schema: discovery_schema(target),
        use_search: true,
    }
}

/// Facts and post are embedded as JSON so the narrative builds on exactly
/// what discovery already surfaced.
pub fn writing_request(
    target: &BriefingTarget,
    now: DateTime<Utc>,
    key_facts: &[String],
    tweet: &TweetHighlight,
) -> GenerationRequest {
    let facts = serde_json::to_string(key_facts).unwrap_or_else(|_| "[]".to_string());
    let tweet = serde_json::to_string(tweet).unwrap_or_else(|_| "{}".to_string());
    let prompt = format!(
        "Current Date: {date}\n\n\
         TASK: Write a detailed briefing about {subject} based on these key facts and this post:\n\
         Facts: {facts}\n\
         Post: {tweet}\n\n\
         Requirements:\n\
         - Search for additional details if necessary to make the report comprehensive.\n\
         - Structure:\n\
         \x20   1. **Highlights**: 1 sentence on the biggest story.\n\
         \x20   2. **Private & Travel**: Location and personal updates.\n\
         \x20   3. **Companies & Projects**: Company news.\n\
         \x20   4. **On X**: Mention the post and its context.\n\
         - Tone: Professional, neutral, {language}.",
        date = long_date(now),
        subject = target.subject,
        language = target.language,
    );
    GenerationRequest {
        stage: Stage::Writing,
        prompt,
        response_schema: writing_schema(target),
        use_search: true,
    }
}
