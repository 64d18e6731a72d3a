//! Response parser: pulls the JSON payload out of raw model text and checks
//! it against the shape each stage expects before anything downstream
//! touches it.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::report::TweetHighlight;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("no JSON object found in response")]
    NoJson,
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("field has unexpected type: {0}")]
    WrongType(String),
}

impl PayloadError {
    /// Schema violations as opposed to text that never was JSON.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            PayloadError::MissingField(_) | PayloadError::NotAnObject | PayloadError::WrongType(_)
        )
    }
}

/// A required top-level field plus the legacy names it may arrive under.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl Field {
    pub const fn new(name: &'static str) -> Self {
        Self { name, aliases: &[] }
    }

    pub const fn with_aliases(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }
}

pub const DISCOVERY_FIELDS: &[Field] = &[
    Field::with_aliases("subject", &["germanSubject"]),
    Field::new("keyFacts"),
    Field::new("tweet"),
];

pub const WRITING_FIELDS: &[Field] = &[Field::with_aliases("body", &["germanBody"])];

/// Slice the text between the first `{` and the last `}` (inclusive) and
/// parse it. Without both delimiters, code fences are stripped and the rest
/// is parsed as-is.
///
/// Braces inside string values are harmless because only the outermost pair
/// matters. A stray `}` after the real object is not handled.
pub fn extract_json(raw: &str) -> Result<Value, PayloadError> {
    let candidate = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            let stripped = strip_fences(raw);
            if stripped.is_empty() {
                return Err(PayloadError::NoJson);
            }
            return Ok(serde_json::from_str(&stripped)?);
        }
    };
    Ok(serde_json::from_str(candidate)?)
}

fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Fail on the first required field that is absent (or `null`).
pub fn validate_shape(json: &Value, required: &[Field]) -> Result<(), PayloadError> {
    let obj = json.as_object().ok_or(PayloadError::NotAnObject)?;
    for field in required {
        let present = std::iter::once(field.name)
            .chain(field.aliases.iter().copied())
            .any(|k| obj.get(k).is_some_and(|v| !v.is_null()));
        if !present {
            return Err(PayloadError::MissingField(field.name));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryPayload {
    #[serde(alias = "germanSubject")]
    pub subject: String,
    pub key_facts: Vec<String>,
    pub tweet: TweetHighlight,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WritingPayload {
    #[serde(alias = "germanBody")]
    pub body: String,
}

fn parse_payload<T: DeserializeOwned>(raw: &str, required: &[Field]) -> Result<T, PayloadError> {
    let json = extract_json(raw)?;
    validate_shape(&json, required)?;
    serde_json::from_value(json).map_err(|e| PayloadError::WrongType(e.to_string()))
}

pub fn parse_discovery(raw: &str) -> Result<DiscoveryPayload, PayloadError> {
    parse_payload(raw, DISCOVERY_FIELDS)
}

pub fn parse_writing(raw: &str) -> Result<WritingPayload, PayloadError> {
    parse_payload(raw, WRITING_FIELDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_from_prose_and_fences() {
        let raw = "Here you go:\n```json\n{\"body\": \"x\"}\n```\nDone.";
        assert_eq!(extract_json(raw).unwrap(), json!({"body": "x"}));
    }

    #[test]
    fn braces_inside_strings_are_kept() {
        let raw = r#"note {"body": "a {nested} value"} end"#;
        assert_eq!(extract_json(raw).unwrap(), json!({"body": "a {nested} value"}));
    }

    #[test]
    fn fence_only_scalar_falls_back() {
        assert_eq!(extract_json("```json\n[1, 2]\n```").unwrap(), json!([1, 2]));
    }

    #[test]
    fn plain_prose_is_an_error() {
        assert!(matches!(
            extract_json("no payload here"),
            Err(PayloadError::InvalidJson(_))
        ));
        assert!(matches!(extract_json("  ```  "), Err(PayloadError::NoJson)));
    }

    #[test]
    fn stray_trailing_brace_is_best_effort() {
        assert!(extract_json(r#"{"body": "x"} trailing }"#).is_err());
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let v = json!({"subject": "s", "keyFacts": []});
        match validate_shape(&v, DISCOVERY_FIELDS) {
            Err(PayloadError::MissingField(f)) => assert_eq!(f, "tweet"),
            other => panic!("unexpected: {other:?}"),
        }
        let null_body = json!({"body": null});
        assert!(validate_shape(&null_body, WRITING_FIELDS).is_err());
        assert!(validate_shape(&json!([1]), WRITING_FIELDS).is_err());
    }

    #[test]
    fn legacy_aliases_accepted() {
        let d = parse_discovery(
            r#"{"germanSubject":"X","keyFacts":["a","b"],"tweet":{"text":"t","url":"u","date":"2h ago"}}"#,
        )
        .unwrap();
        assert_eq!(d.subject, "X");
        assert_eq!(d.key_facts, vec!["a", "b"]);
        let w = parse_writing(r#"{"germanBody":"full text"}"#).unwrap();
        assert_eq!(w.body, "full text");
    }

    #[test]
    fn wrong_types_are_schema_errors() {
        let err = parse_discovery(r#"{"subject":"X","keyFacts":"a","tweet":{"text":"t","url":"u","date":"d"}}"#)
            .unwrap_err();
        assert!(err.is_schema(), "{err}");
        let err = parse_discovery(r#"{"subject":"X","keyFacts":[],"tweet":{"text":"t"}}"#).unwrap_err();
        assert!(err.is_schema(), "{err}");
        assert!(!parse_writing("garbage").unwrap_err().is_schema());
    }
}
