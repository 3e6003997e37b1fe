use anyhow::{Context, Result};
use gasto_ingest::DatePrecedence;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::ensure_gasto_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub llm: LlmSection,
    pub webhook: WebhookSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// IANA timezone used to decide what "hoje" means
    pub timezone: String,
    pub default_category: String,
    pub date_precedence: DatePrecedence,
    /// Replaces the built-in income word roots when set
    pub income_roots: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Model fallback is only attempted when enabled and the key is present
    pub enabled: bool,
    /// "openai" or "anthropic"
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSection {
    /// n8n (or any) endpoint receiving each record as JSON
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            timezone: gasto_core::time::DEFAULT_TIMEZONE.to_string(),
            default_category: gasto_pipeline::DEFAULT_CATEGORY.to_string(),
            date_precedence: DatePrecedence::RelativeFirst,
            income_roots: None,
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 10_000,
        }
    }
}

impl LlmSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl WebhookSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_gasto_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = parse_config(
            r#"
[pipeline]
default_category = "Diversos"
date_precedence = "absolute-first"

[llm]
enabled = true
provider = "anthropic"
"#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.default_category, "Diversos");
        assert_eq!(cfg.pipeline.date_precedence, DatePrecedence::AbsoluteFirst);
        assert_eq!(cfg.pipeline.timezone, "America/Sao_Paulo");
        assert!(cfg.llm.enabled);
        assert_eq!(cfg.llm.provider, "anthropic");
        assert_eq!(cfg.llm.timeout(), Duration::from_millis(5000));
        assert!(cfg.webhook.url.is_none());
    }

    #[test]
    fn test_default_config_round_trips() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        let back = parse_config(&s).unwrap();
        assert_eq!(back.pipeline.default_category, "Outros");
        assert_eq!(back.llm.model, "gpt-4o-mini");
    }
}
