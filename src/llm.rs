//! LLM responder abstraction and implementations.
//!
//! A single LLM call both classifies the customer's persona and writes the
//! tone-adapted reply. The pipeline only depends on the [`Responder`] trait:
//!
//! - **[`OpenAiResponder`]**: calls an OpenAI-compatible
//!   `/chat/completions` endpoint with retry and backoff.
//! - **[`DisabledResponder`]**: always fails; used when `llm.provider = "disabled"`.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, … (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use support_agent_core::models::{Role, ScoredArticle, Turn};

use crate::config::LlmConfig;

/// Customer sentiment reported by the responder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

/// Request urgency reported by the responder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

/// Structured reply produced by one responder call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentReply {
    pub persona: String,
    pub confidence: f64,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub response: String,
    #[serde(default)]
    pub kb_articles_used: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl AgentReply {
    /// Reply used when the model's output is not valid reply JSON.
    pub fn fallback(persona: &str) -> Self {
        Self {
            persona: persona.to_string(),
            confidence: 0.5,
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Medium,
            response: "I understand your question. Let me help you with that. \
                       Could you provide more details?"
                .to_string(),
            kb_articles_used: Vec::new(),
            reasoning: "Error in LLM response parsing".to_string(),
        }
    }
}

/// Everything the responder needs for one message.
#[derive(Debug, Clone)]
pub struct ResponderRequest<'a> {
    pub message: &'a str,
    /// Full conversation so far; only the tail is rendered into the prompt.
    pub history: &'a [Turn],
    pub articles: &'a [ScoredArticle],
    /// Persona labels the model may choose from.
    pub personas: &'a [String],
    /// Persona reported if the reply cannot be parsed.
    pub fallback_persona: &'a str,
}

#[async_trait]
pub trait Responder: Send + Sync {
    /// Provider identifier, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// Produce a structured reply. Errors mean the call itself failed;
    /// unparsable model output yields [`AgentReply::fallback`] instead.
    async fn respond(&self, request: &ResponderRequest<'_>) -> Result<AgentReply>;
}

/// Build a responder for the configured provider.
pub fn create_responder(config: &LlmConfig) -> Result<Box<dyn Responder>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiResponder::new(config)?)),
        "disabled" => Ok(Box::new(DisabledResponder)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

const HISTORY_TURNS: usize = 4;

fn persona_guidance(persona: &str) -> (&str, &str) {
    match persona {
        "technical_expert" => (
            "Uses technical jargon, asks about APIs/integrations/implementation",
            "Be precise, technical, concise. Include specifics.",
        ),
        "frustrated_user" => (
            "Expresses frustration/anger, reports issues, needs immediate help",
            "Lead with empathy, be reassuring, offer quick solutions.",
        ),
        "business_exec" => (
            "Asks about ROI/pricing/compliance/business value",
            "Focus on business value, ROI, be professional and strategic.",
        ),
        _ => (
            "Matches this customer category",
            "Adapt tone to this customer category.",
        ),
    }
}

/// Render the classification + response prompt.
pub fn build_prompt(request: &ResponderRequest<'_>) -> String {
    let tail = &request.history[request.history.len().saturating_sub(HISTORY_TURNS)..];
    let context = if tail.is_empty() {
        "No prior context".to_string()
    } else {
        tail.iter()
            .map(|t| {
                let who = match t.role {
                    Role::User => "Customer",
                    Role::Agent => "Agent",
                };
                format!("{}: {}", who, t.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let kb_context = if request.articles.is_empty() {
        "No specific KB articles found.".to_string()
    } else {
        request
            .articles
            .iter()
            .map(|a| format!("- {}", a.article.summary()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut detection = String::new();
    let mut tone = String::new();
    for persona in request.personas {
        let (signals, style) = persona_guidance(persona);
        detection.push_str(&format!("   - {}: {}\n", persona, signals));
        tone.push_str(&format!("   - {}: {}\n", persona, style));
    }
    let choices = request
        .personas
        .iter()
        .map(|p| format!("\"{}\"", p))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        r#"You are an intelligent customer support agent. Analyze the customer's message and respond appropriately.

CONVERSATION HISTORY:
{context}

CURRENT MESSAGE: "{message}"

AVAILABLE KNOWLEDGE BASE:
{kb_context}

YOUR TASK - Respond with valid JSON containing:
1. PERSONA DETECTION: Classify customer into ONE persona
{detection}
2. TONE-ADAPTED RESPONSE:
{tone}
3. USE KB CONTENT when relevant to answer the question.

RESPOND ONLY WITH VALID JSON (no markdown):
{{
  "persona": {choices},
  "confidence": 0.0-1.0,
  "sentiment": "positive" | "neutral" | "negative",
  "urgency": "low" | "medium" | "high",
  "response": "your tone-adapted response here",
  "kb_articles_used": ["list of KB article titles you referenced"],
  "reasoning": "brief explanation of persona classification"
}}"#,
        message = request.message,
    )
}

/// Parse model output into an [`AgentReply`], tolerating Markdown code fences.
pub fn parse_reply(text: &str, fallback_persona: &str) -> AgentReply {
    let cleaned = text.trim().replace("```json", "").replace("```", "");
    match serde_json::from_str::<AgentReply>(cleaned.trim()) {
        Ok(mut reply) => {
            reply.confidence = reply.confidence.clamp(0.0, 1.0);
            reply
        }
        Err(e) => {
            tracing::warn!(error = %e, "unparsable responder output, using fallback reply");
            AgentReply::fallback(fallback_persona)
        }
    }
}

// ============ Disabled Responder ============

/// A responder that always fails.
pub struct DisabledResponder;

#[async_trait]
impl Responder for DisabledResponder {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn respond(&self, _request: &ResponderRequest<'_>) -> Result<AgentReply> {
        bail!("LLM provider is disabled")
    }
}

// ============ OpenAI Responder ============

/// Responder backed by an OpenAI-compatible chat completions API.
pub struct OpenAiResponder {
    client: reqwest::Client,
    api_key: String,
    config: LlmConfig,
}

impl OpenAiResponder {
    /// # Errors
    ///
    /// Fails if the API key variable is unset or still holds the placeholder
    /// value, or if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!(
                "{} not found! Set it in the environment to use the openai provider",
                config.api_key_env
            )
        })?;
        if api_key.trim().is_empty() || api_key == "your-actual-api-key-here" {
            bail!(
                "{} holds a placeholder value; replace it with a real API key",
                config.api_key_env
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            config: config.clone(),
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        tracing::warn!(%status, attempt, "chat completion failed, retrying");
                        last_err = Some(anyhow::anyhow!("LLM API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("LLM API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "chat completion request failed");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Chat completion failed after retries")))
    }
}

/// Extract `choices[0].message.content` from a chat completions response.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid chat completion response: missing message content"))
}

#[async_trait]
impl Responder for OpenAiResponder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn respond(&self, request: &ResponderRequest<'_>) -> Result<AgentReply> {
        let prompt = build_prompt(request);
        let text = self
            .complete(&prompt)
            .await
            .map_err(|e| anyhow::anyhow!("LLM API Error: {}", e))?;
        Ok(parse_reply(&text, request.fallback_persona))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use support_agent_core::models::Article;

    fn personas() -> Vec<String> {
        vec!["technical_expert".to_string(), "business_exec".to_string()]
    }

    #[test]
    fn test_parse_reply_strips_fences() {
        let text = "```json\n{\"persona\":\"business_exec\",\"confidence\":0.9,\"sentiment\":\"positive\",\
                    \"urgency\":\"low\",\"response\":\"Hi\",\"kb_articles_used\":[\"Pricing & Plans\"],\
                    \"reasoning\":\"asks about price\"}\n```";
        let reply = parse_reply(text, "frustrated_user");
        assert_eq!(reply.persona, "business_exec");
        assert_eq!(reply.sentiment, Sentiment::Positive);
        assert_eq!(reply.kb_articles_used, vec!["Pricing & Plans"]);
    }

    #[test]
    fn test_parse_reply_falls_back_on_garbage() {
        let reply = parse_reply("Sorry, I cannot do that.", "frustrated_user");
        assert_eq!(reply, AgentReply::fallback("frustrated_user"));
        assert_eq!(reply.confidence, 0.5);
    }

    #[test]
    fn test_parse_reply_falls_back_on_unknown_sentiment() {
        let text = r#"{"persona":"x","confidence":0.9,"sentiment":"ecstatic","urgency":"low","response":"r"}"#;
        assert_eq!(parse_reply(text, "p").reasoning, "Error in LLM response parsing");
    }

    #[test]
    fn test_parse_reply_clamps_confidence() {
        let text = r#"{"persona":"x","confidence":1.7,"sentiment":"neutral","urgency":"low","response":"r"}"#;
        assert_eq!(parse_reply(text, "p").confidence, 1.0);
    }

    #[test]
    fn test_prompt_includes_history_and_articles() {
        let history = vec![
            Turn::user("one"),
            Turn::agent("two"),
            Turn::user("three"),
            Turn::agent("four"),
            Turn::user("five"),
        ];
        let articles = vec![ScoredArticle {
            article: Article::new(8, "Pricing & Plans", "Starter: $49/mo", &[]),
            relevance_score: 0.4,
        }];
        let personas = personas();
        let prompt = build_prompt(&ResponderRequest {
            message: "how much?",
            history: &history,
            articles: &articles,
            personas: &personas,
            fallback_persona: "technical_expert",
        });
        assert!(!prompt.contains("Customer: one"));
        assert!(prompt.contains("Agent: two\nCustomer: three"));
        assert!(prompt.contains("- Pricing & Plans: Starter: $49/mo"));
        assert!(prompt.contains("CURRENT MESSAGE: \"how much?\""));
        assert!(prompt.contains("\"technical_expert\" | \"business_exec\""));
    }

    #[test]
    fn test_prompt_without_context() {
        let personas = personas();
        let prompt = build_prompt(&ResponderRequest {
            message: "hi",
            history: &[],
            articles: &[],
            personas: &personas,
            fallback_persona: "technical_expert",
        });
        assert!(prompt.contains("No prior context"));
        assert!(prompt.contains("No specific KB articles found."));
    }

    #[test]
    fn test_parse_completion() {
        let json = serde_json::json!({"choices": [{"message": {"content": "  {} "}}]});
        assert_eq!(parse_completion(&json).unwrap(), "{}");
        assert!(parse_completion(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn test_disabled_responder_errors() {
        let personas = personas();
        let err = DisabledResponder
            .respond(&ResponderRequest {
                message: "hi",
                history: &[],
                articles: &[],
                personas: &personas,
                fallback_persona: "x",
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }
}
