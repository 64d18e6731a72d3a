// src/config/agent.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::error::ReportError;

pub const ENV_CONFIG_PATH: &str = "AGENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.json";

/// Env vars consulted (in order) when `api_key` is "ENV" or empty.
const KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

fn default_subject() -> String {
    "Elon Musk".to_string()
}
fn default_handle() -> String {
    "elonmusk".to_string()
}
fn default_topics() -> Vec<String> {
    [
        "Personal Life & Travel",
        "xAI / Grok / X",
        "Tesla / SpaceX",
        "Neuralink / Boring",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_language() -> String {
    "German".to_string()
}
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_last_run_path() -> PathBuf {
    PathBuf::from("cache/last_run.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name of the monitored person.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// X handle without the `@`.
    #[serde(default = "default_handle")]
    pub handle: String,
    /// Monitoring scope; fed into the discovery prompt.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    /// Output language of subject, facts and body.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read GEMINI_API_KEY, then API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_last_run_path")]
    pub last_run_path: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            handle: default_handle(),
            topics: default_topics(),
            language: default_language(),
            model: default_model(),
            api_key: default_api_key(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            last_run_path: default_last_run_path(),
        }
    }
}

impl AgentConfig {
    /// Load from JSON, or TOML when the extension says so, then resolve the key.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading agent config from {}", path.display()))?;
        let is_toml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let mut cfg: AgentConfig = if is_toml {
            toml::from_str(&data).context("parsing agent config toml")?
        } else {
            serde_json::from_str(&data).context("parsing agent config json")?
        };
        cfg.normalize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $AGENT_CONFIG_PATH (must exist)
    /// 2) config/agent.json
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self::default();
        cfg.normalize();
        Ok(cfg)
    }

    fn normalize(&mut self) {
        self.handle = self.handle.trim().trim_start_matches('@').to_string();
        self.topics.retain(|t| !t.trim().is_empty());
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        let key = self.api_key.trim();
        if key.is_empty() || key.eq_ignore_ascii_case("env") {
            self.api_key = resolve_key_from_env().unwrap_or_default();
        }
    }

    /// The credential, or a configuration error when none is available.
    pub fn require_api_key(&self) -> Result<&str, ReportError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(ReportError::Configuration(format!(
                "API key missing; set one of {} or api_key in {DEFAULT_CONFIG_PATH}",
                KEY_ENV_VARS.join(", ")
            )));
        }
        Ok(key)
    }
}

fn resolve_key_from_env() -> Option<String> {
    KEY_ENV_VARS
        .iter()
        .filter_map(|k| env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[serial_test::serial]
    #[test]
    fn env_key_resolution_prefers_gemini_var() {
        env::set_var("GEMINI_API_KEY", "g-key");
        env::set_var("API_KEY", "plain-key");
        let cfg = AgentConfig::load_default_from_str(r#"{"api_key": "ENV"}"#);
        assert_eq!(cfg.api_key, "g-key");

        env::remove_var("GEMINI_API_KEY");
        let cfg = AgentConfig::load_default_from_str(r#"{}"#);
        assert_eq!(cfg.api_key, "plain-key");

        env::remove_var("API_KEY");
        let cfg = AgentConfig::load_default_from_str(r#"{"handle": "@someone"}"#);
        assert!(cfg.require_api_key().is_err());
        assert_eq!(cfg.handle, "someone");
    }

    #[serial_test::serial]
    #[test]
    fn literal_key_and_toml_format() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("agent.toml");
        fs::write(
            &p,
            "subject = \"Ada Lovelace\"\nhandle = \"ada\"\napi_key = \"lit\"\ntopics = [\"Math\", \" \"]\n",
        )
        .unwrap();
        let cfg = AgentConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.subject, "Ada Lovelace");
        assert_eq!(cfg.require_api_key().unwrap(), "lit");
        assert_eq!(cfg.topics, vec!["Math".to_string()]);
        assert_eq!(cfg.model, default_model());
    }

    impl AgentConfig {
        fn load_default_from_str(s: &str) -> Self {
            let mut cfg: AgentConfig = serde_json::from_str(s).unwrap();
            cfg.normalize();
            cfg
        }
    }
}
