//! Running counters over processed messages.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::llm::{Sentiment, Urgency};

/// One processed message, as seen by the tracker.
#[derive(Debug, Clone)]
pub struct RequestRecord<'a> {
    pub persona: &'a str,
    pub kb_articles: usize,
    pub confidence: f64,
    pub elapsed: Duration,
    pub escalated: bool,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
}

#[derive(Debug, Default, Clone)]
pub struct MetricsTracker {
    total_requests: u64,
    persona_detections: BTreeMap<String, u64>,
    kb_hits: u64,
    escalations: u64,
    sentiment_distribution: BTreeMap<String, u64>,
    urgency_distribution: BTreeMap<String, u64>,
    response_time_sum: f64,
    confidence_sum: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub persona_distribution: BTreeMap<String, u64>,
    /// Percentage of requests that retrieved at least one article.
    pub kb_hit_rate: f64,
    pub escalation_rate: f64,
    /// Seconds.
    pub avg_response_time: f64,
    pub avg_confidence: f64,
    pub sentiment_distribution: BTreeMap<String, u64>,
    pub urgency_distribution: BTreeMap<String, u64>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, r: &RequestRecord<'_>) {
        self.total_requests += 1;
        *self
            .persona_detections
            .entry(r.persona.to_string())
            .or_default() += 1;
        *self
            .sentiment_distribution
            .entry(r.sentiment.as_str().to_string())
            .or_default() += 1;
        *self
            .urgency_distribution
            .entry(r.urgency.as_str().to_string())
            .or_default() += 1;

        if r.kb_articles > 0 {
            self.kb_hits += 1;
        }
        if r.escalated {
            self.escalations += 1;
        }

        self.response_time_sum += r.elapsed.as_secs_f64();
        self.confidence_sum += r.confidence;
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// `None` until the first request is recorded.
    pub fn summary(&self) -> Option<MetricsSummary> {
        if self.total_requests == 0 {
            return None;
        }
        let total = self.total_requests as f64;
        Some(MetricsSummary {
            total_requests: self.total_requests,
            persona_distribution: self.persona_detections.clone(),
            kb_hit_rate: round(self.kb_hits as f64 / total * 100.0, 1),
            escalation_rate: round(self.escalations as f64 / total * 100.0, 1),
            avg_response_time: round(self.response_time_sum / total, 2),
            avg_confidence: round(self.confidence_sum / total, 2),
            sentiment_distribution: self.sentiment_distribution.clone(),
            urgency_distribution: self.urgency_distribution.clone(),
        })
    }
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
