//! TOML configuration parsing and validation.
//!
//! Every section is optional; omitted values fall back to the defaults
//! below. See `config/agent.example.toml` for a full example.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use support_agent_core::retrieve::RetrievalParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f64 {
    0.7
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f64,
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_context_user_turns")]
    pub context_user_turns: usize,
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: usize,
    /// Results taken from each category when no persona is cached.
    #[serde(default = "default_fanout_per_category")]
    pub fanout_per_category: usize,
    /// Results kept overall after the multi-category fan-out.
    #[serde(default = "default_fanout_limit")]
    pub fanout_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            relevance_floor: default_relevance_floor(),
            max_features: default_max_features(),
            context_window: default_context_window(),
            context_user_turns: default_context_user_turns(),
            keyword_limit: default_keyword_limit(),
            fanout_per_category: default_fanout_per_category(),
            fanout_limit: default_fanout_limit(),
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            max_features: self.max_features,
            relevance_floor: self.relevance_floor,
            context_window: self.context_window,
            context_user_turns: self.context_user_turns,
            keyword_limit: self.keyword_limit,
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_relevance_floor() -> f64 {
    0.1
}
fn default_max_features() -> usize {
    100
}
fn default_context_window() -> usize {
    4
}
fn default_context_user_turns() -> usize {
    2
}
fn default_keyword_limit() -> usize {
    3
}
fn default_fanout_per_category() -> usize {
    1
}
fn default_fanout_limit() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Personas detected with at least this confidence are cached per session.
    #[serde(default = "default_confidence_threshold")]
    pub persona_confidence_threshold: f64,
    /// Escalate once the conversation history holds this many turns.
    #[serde(default = "default_escalation_message_threshold")]
    pub escalation_message_threshold: usize,
    /// Escalate when this many consecutive sentiments are negative.
    #[serde(default = "default_sentiment_window")]
    pub sentiment_degradation_window: usize,
    #[serde(default = "default_sentiment_history_limit")]
    pub sentiment_history_limit: usize,
    /// Adjacent user messages sharing more than this many words count as a repeat.
    #[serde(default = "default_repeated_question_overlap")]
    pub repeated_question_overlap: usize,
    #[serde(default = "default_urgent_persona")]
    pub urgent_persona: String,
    /// Persona reported when the responder's reply cannot be parsed.
    #[serde(default = "default_urgent_persona")]
    pub fallback_persona: String,
    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persona_confidence_threshold: default_confidence_threshold(),
            escalation_message_threshold: default_escalation_message_threshold(),
            sentiment_degradation_window: default_sentiment_window(),
            sentiment_history_limit: default_sentiment_history_limit(),
            repeated_question_overlap: default_repeated_question_overlap(),
            urgent_persona: default_urgent_persona(),
            fallback_persona: default_urgent_persona(),
            escalation_keywords: default_escalation_keywords(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.8
}
fn default_escalation_message_threshold() -> usize {
    5
}
fn default_sentiment_window() -> usize {
    2
}
fn default_sentiment_history_limit() -> usize {
    10
}
fn default_repeated_question_overlap() -> usize {
    3
}
fn default_urgent_persona() -> String {
    "frustrated_user".to_string()
}
fn default_escalation_keywords() -> Vec<String> {
    [
        "speak to manager",
        "lawyer",
        "sue",
        "terrible service",
        "cancel account",
        "refund now",
        "waste of time",
        "useless",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// TOML or JSON catalog file. The built-in reference catalog is used when unset.
    pub path: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Relative catalog paths are resolved against the config file's directory
    if let Some(catalog) = config.catalog.path.as_mut() {
        if catalog.is_relative() {
            if let Some(dir) = path.parent() {
                *catalog = dir.join(&*catalog);
            }
        }
    }

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    config
        .retrieval
        .params()
        .validate()
        .map_err(|e| anyhow::anyhow!("retrieval: {}", e))?;

    if config.retrieval.fanout_limit == 0 {
        bail!("retrieval.fanout_limit must be >= 1");
    }

    let agent = &config.agent;
    if !(0.0..=1.0).contains(&agent.persona_confidence_threshold) {
        bail!("agent.persona_confidence_threshold must be in [0.0, 1.0]");
    }
    if agent.sentiment_degradation_window == 0 {
        bail!("agent.sentiment_degradation_window must be >= 1");
    }
    if agent.sentiment_history_limit < agent.sentiment_degradation_window {
        bail!(
            "agent.sentiment_history_limit ({}) must be >= agent.sentiment_degradation_window ({})",
            agent.sentiment_history_limit,
            agent.sentiment_degradation_window
        );
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }
    match config.llm.provider.as_str() {
        "openai" | "disabled" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be openai or disabled.",
            other
        ),
    }

    Ok(())
}
