//! Per-session conversation and persona state.

use std::collections::{HashMap, VecDeque};

use support_agent_core::models::Turn;

use crate::llm::Sentiment;

/// Persona detected with enough confidence to skip the multi-category fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPersona {
    pub persona: String,
    pub confidence: f64,
}

#[derive(Debug, Default, Clone)]
pub struct Session {
    pub history: Vec<Turn>,
    pub persona: Option<CachedPersona>,
    sentiments: VecDeque<Sentiment>,
}

impl Session {
    /// Most recent sentiments, oldest first.
    pub fn sentiments(&self) -> Vec<Sentiment> {
        self.sentiments.iter().copied().collect()
    }

    /// Record a sentiment, dropping the oldest once `limit` is reached.
    pub fn record_sentiment(&mut self, sentiment: Sentiment, limit: usize) {
        self.sentiments.push_back(sentiment);
        while self.sentiments.len() > limit.max(1) {
            self.sentiments.pop_front();
        }
    }

    /// Persona to retrieve with, if one was cached at or above `threshold`.
    pub fn confident_persona(&self, threshold: f64) -> Option<&str> {
        self.persona
            .as_ref()
            .filter(|p| p.confidence >= threshold)
            .map(|p| p.persona.as_str())
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn entry(&mut self, id: &str) -> &mut Session {
        self.sessions.entry(id.to_string()).or_default()
    }

    /// Forget everything about a session. Returns whether it existed.
    pub fn reset(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
