//! The message-processing pipeline.
//!
//! For every incoming message [`SupportAgent::process_message`]:
//!
//! 1. retrieves KB articles, either from the session's cached persona
//!    category or by fanning out over every category;
//! 2. asks the [`Responder`] to classify the customer and write a reply;
//! 3. caches the persona when the responder is confident enough;
//! 4. evaluates the escalation rules;
//! 5. appends the exchange to the session history and records metrics.
//!
//! Session and metrics state sit behind `std::sync::Mutex`es that are never
//! held across the responder call.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use support_agent_core::catalog::Catalog;
use support_agent_core::models::{ScoredArticle, Turn};
use support_agent_core::retrieve::Retriever;

use crate::catalog::resolve_catalog;
use crate::config::{AgentConfig, Config, RetrievalConfig};
use crate::escalation::EscalationPolicy;
use crate::llm::{create_responder, Responder, ResponderRequest, Sentiment, Urgency};
use crate::metrics::{MetricsSummary, MetricsTracker, RequestRecord};
use crate::session::{CachedPersona, SessionStore};

#[derive(Debug, Clone, Serialize)]
pub struct PersonaInfo {
    pub persona: String,
    pub confidence: f64,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub reasoning: String,
    /// Whether retrieval used a persona cached from an earlier message.
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMetrics {
    /// Seconds, rounded to two places.
    pub response_time: f64,
    pub kb_articles_found: usize,
    pub conversation_length: usize,
}

/// Hand-off bundle attached to escalated responses.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationContext {
    pub session_id: String,
    pub conversation_length: usize,
    pub persona: String,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub full_history: Vec<Turn>,
    pub sentiment_history: Vec<Sentiment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub persona: PersonaInfo,
    pub response: String,
    pub kb_articles: Vec<ScoredArticle>,
    /// Article titles the responder says it drew on.
    pub kb_used: Vec<String>,
    pub escalate: bool,
    pub escalation_reason: Option<String>,
    pub metrics: ResponseMetrics,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_context: Option<EscalationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SupportAgent {
    retriever: Retriever,
    responder: Box<dyn Responder>,
    policy: EscalationPolicy,
    retrieval: RetrievalConfig,
    agent: AgentConfig,
    personas: Vec<String>,
    sessions: Mutex<SessionStore>,
    metrics: Mutex<MetricsTracker>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl SupportAgent {
    pub fn new(config: &Config, catalog: &Catalog, responder: Box<dyn Responder>) -> Result<Self> {
        let retriever = Retriever::new(catalog, config.retrieval.params())?;
        tracing::info!(
            categories = catalog.categories().len(),
            articles = catalog.article_count(),
            responder = responder.name(),
            "support agent ready"
        );
        Ok(Self {
            retriever,
            responder,
            policy: EscalationPolicy::new(&config.agent),
            retrieval: config.retrieval.clone(),
            agent: config.agent.clone(),
            personas: catalog.names().map(str::to_string).collect(),
            sessions: Mutex::new(SessionStore::new()),
            metrics: Mutex::new(MetricsTracker::new()),
        })
    }

    /// Build the agent from configuration: catalog file (or the reference
    /// catalog) plus the configured LLM provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = resolve_catalog(config)?;
        let responder = create_responder(&config.llm)?;
        Self::new(config, &catalog, responder)
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn responder_name(&self) -> &str {
        self.responder.name()
    }

    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        lock(&self.sessions)
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.sessions).active_sessions()
    }

    pub fn total_requests(&self) -> u64 {
        lock(&self.metrics).total_requests()
    }

    pub fn metrics_summary(&self) -> Option<MetricsSummary> {
        lock(&self.metrics).summary()
    }

    /// Clear a session's conversation and persona state.
    pub fn reset(&self, session_id: &str) {
        let existed = lock(&self.sessions).reset(session_id);
        tracing::info!(session_id, existed, "session reset");
    }

    pub async fn process_message(&self, session_id: &str, message: &str) -> ChatResponse {
        let start = Instant::now();

        let (history, cached_persona) = {
            let sessions = lock(&self.sessions);
            match sessions.get(session_id) {
                Some(s) => (
                    s.history.clone(),
                    s.confident_persona(self.agent.persona_confidence_threshold)
                        .map(str::to_string),
                ),
                None => (Vec::new(), None),
            }
        };

        let kb_articles = match &cached_persona {
            Some(persona) => {
                self.retriever
                    .retrieve(persona, message, &history, self.retrieval.top_k)
            }
            None => self.retriever.retrieve_across(
                message,
                &history,
                self.retrieval.fanout_per_category,
                self.retrieval.fanout_limit,
            ),
        };
        tracing::debug!(
            session_id,
            cached = cached_persona.is_some(),
            hits = kb_articles.len(),
            "knowledge base retrieval"
        );

        let request = ResponderRequest {
            message,
            history: &history,
            articles: &kb_articles,
            personas: &self.personas,
            fallback_persona: &self.agent.fallback_persona,
        };
        let reply = match self.responder.respond(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session_id, error = %e, "responder failed");
                return self.error_response(session_id, &e, start);
            }
        };

        let (escalation, conversation, sentiment_history) = {
            let mut sessions = lock(&self.sessions);
            let session = sessions.entry(session_id);

            if reply.confidence >= self.agent.persona_confidence_threshold {
                session.persona = Some(CachedPersona {
                    persona: reply.persona.clone(),
                    confidence: reply.confidence,
                });
            }
            session.record_sentiment(reply.sentiment, self.agent.sentiment_history_limit);
            let sentiments = session.sentiments();

            let escalation = self
                .policy
                .evaluate(message, &session.history, &reply, &sentiments);

            session.history.push(Turn::user(message));
            session.history.push(Turn::agent(reply.response.clone()));
            (escalation, session.history.clone(), sentiments)
        };

        let elapsed = start.elapsed();
        lock(&self.metrics).record(&RequestRecord {
            persona: &reply.persona,
            kb_articles: kb_articles.len(),
            confidence: reply.confidence,
            elapsed,
            escalated: escalation.is_some(),
            sentiment: reply.sentiment,
            urgency: reply.urgency,
        });

        tracing::info!(
            session_id,
            persona = %reply.persona,
            confidence = reply.confidence,
            escalate = escalation.is_some(),
            elapsed_ms = elapsed.as_millis() as u64,
            "message processed"
        );

        let escalation_context = escalation.map(|_| EscalationContext {
            session_id: session_id.to_string(),
            conversation_length: conversation.len(),
            persona: reply.persona.clone(),
            sentiment: reply.sentiment,
            urgency: reply.urgency,
            full_history: conversation.clone(),
            sentiment_history,
        });

        ChatResponse {
            persona: PersonaInfo {
                persona: reply.persona,
                confidence: reply.confidence,
                sentiment: reply.sentiment,
                urgency: reply.urgency,
                reasoning: reply.reasoning,
                cached: cached_persona.is_some(),
            },
            response: reply.response,
            metrics: ResponseMetrics {
                response_time: round2(elapsed.as_secs_f64()),
                kb_articles_found: kb_articles.len(),
                conversation_length: conversation.len(),
            },
            kb_articles,
            kb_used: reply.kb_articles_used,
            escalate: escalation.is_some(),
            escalation_reason: escalation.map(|r| r.message()),
            timestamp: Utc::now(),
            escalation_context,
            error: None,
        }
    }

    fn error_response(
        &self,
        session_id: &str,
        err: &anyhow::Error,
        start: Instant,
    ) -> ChatResponse {
        let detail = err.to_string();
        ChatResponse {
            persona: PersonaInfo {
                persona: "unknown".to_string(),
                confidence: 0.0,
                sentiment: Sentiment::Neutral,
                urgency: Urgency::Medium,
                reasoning: "Error occurred".to_string(),
                cached: false,
            },
            response: format!(
                "I apologize, but I'm experiencing technical difficulties. \
                 Let me connect you with a human agent who can better assist you. \
                 Error details: {}",
                detail
            ),
            kb_articles: Vec::new(),
            kb_used: Vec::new(),
            escalate: true,
            escalation_reason: Some(format!("System error: {}", detail)),
            metrics: ResponseMetrics {
                response_time: round2(start.elapsed().as_secs_f64()),
                kb_articles_found: 0,
                conversation_length: self.history(session_id).len(),
            },
            timestamp: Utc::now(),
            escalation_context: None,
            error: Some(detail),
        }
    }
}
