//! Human hand-off rules.
//!
//! [`EscalationPolicy::evaluate`] checks a fixed set of triggers against the
//! incoming message, the conversation so far, and the responder's reading of
//! the customer. When several triggers fire, the reported reason follows the
//! priority order of [`EscalationReason`]'s variants.

use serde::Serialize;
use std::collections::HashSet;

use support_agent_core::models::{Role, Turn};

use crate::config::AgentConfig;
use crate::llm::{AgentReply, Sentiment, Urgency};

/// Why a conversation was handed to a human, in reporting priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    Keyword,
    RepeatedQuestion,
    SentimentDegraded,
    FrustratedAndUrgent,
    LongConversation { threshold: usize },
}

impl EscalationReason {
    pub fn message(&self) -> String {
        match self {
            EscalationReason::Keyword => {
                "Customer used escalation keywords (manager, legal, cancel, etc.)".to_string()
            }
            EscalationReason::RepeatedQuestion => {
                "Customer repeating similar questions - may need human assistance".to_string()
            }
            EscalationReason::SentimentDegraded => {
                "Sentiment degraded to negative in recent messages".to_string()
            }
            EscalationReason::FrustratedAndUrgent => {
                "Frustrated customer with high urgency detected".to_string()
            }
            EscalationReason::LongConversation { threshold } => {
                format!("Conversation exceeded {} exchanges", threshold)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    keywords: Vec<String>,
    message_threshold: usize,
    sentiment_window: usize,
    repeated_overlap: usize,
    urgent_persona: String,
}

/// Turns inspected by the repeated-question check.
const REPEAT_WINDOW: usize = 4;

impl EscalationPolicy {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            keywords: config
                .escalation_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            message_threshold: config.escalation_message_threshold,
            sentiment_window: config.sentiment_degradation_window,
            repeated_overlap: config.repeated_question_overlap,
            urgent_persona: config.urgent_persona.clone(),
        }
    }

    /// Decide whether to escalate.
    ///
    /// `history` is the conversation *before* this message is appended;
    /// `sentiments` already includes the current reply's sentiment.
    pub fn evaluate(
        &self,
        message: &str,
        history: &[Turn],
        reply: &AgentReply,
        sentiments: &[Sentiment],
    ) -> Option<EscalationReason> {
        let lowered = message.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return Some(EscalationReason::Keyword);
        }
        if self.is_repeated_question(history) {
            return Some(EscalationReason::RepeatedQuestion);
        }
        if self.sentiment_degraded(sentiments) {
            return Some(EscalationReason::SentimentDegraded);
        }
        if reply.persona == self.urgent_persona
            && reply.urgency == Urgency::High
            && reply.sentiment == Sentiment::Negative
        {
            return Some(EscalationReason::FrustratedAndUrgent);
        }
        if history.len() >= self.message_threshold {
            return Some(EscalationReason::LongConversation {
                threshold: self.message_threshold,
            });
        }
        None
    }

    fn is_repeated_question(&self, history: &[Turn]) -> bool {
        if history.len() < REPEAT_WINDOW {
            return false;
        }
        let recent: Vec<HashSet<String>> = history[history.len() - REPEAT_WINDOW..]
            .iter()
            .filter(|t| t.role == Role::User)
            .map(|t| {
                t.content
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            })
            .collect();
        recent
            .windows(2)
            .any(|pair| pair[0].intersection(&pair[1]).count() > self.repeated_overlap)
    }

    fn sentiment_degraded(&self, sentiments: &[Sentiment]) -> bool {
        sentiments.len() >= self.sentiment_window
            && sentiments[sentiments.len() - self.sentiment_window..]
                .iter()
                .all(|s| *s == Sentiment::Negative)
    }
}
