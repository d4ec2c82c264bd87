//! End-to-end pipeline tests with a scripted responder standing in for the LLM.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use support_agent::agent::SupportAgent;
use support_agent::catalog::reference_catalog;
use support_agent::config::Config;
use support_agent::llm::{AgentReply, Responder, ResponderRequest, Sentiment, Urgency};

/// Replays canned replies in order and records what it was asked.
struct ScriptedResponder {
    replies: Mutex<VecDeque<Result<AgentReply, String>>>,
    seen: std::sync::Arc<Mutex<Vec<Seen>>>,
}

#[derive(Debug, Clone)]
struct Seen {
    message: String,
    history_len: usize,
    article_ids: Vec<i64>,
}

#[async_trait]
impl Responder for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, request: &ResponderRequest<'_>) -> Result<AgentReply> {
        self.seen.lock().unwrap().push(Seen {
            message: request.message.to_string(),
            history_len: request.history.len(),
            article_ids: request.articles.iter().map(|a| a.article.id).collect(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

fn reply(persona: &str, confidence: f64, sentiment: Sentiment, urgency: Urgency) -> AgentReply {
    AgentReply {
        persona: persona.to_string(),
        confidence,
        sentiment,
        urgency,
        response: format!("reply for {persona}"),
        kb_articles_used: vec![],
        reasoning: "scripted".to_string(),
    }
}

fn calm(persona: &str) -> Result<AgentReply, String> {
    Ok(reply(persona, 0.9, Sentiment::Neutral, Urgency::Low))
}

fn agent(
    script: Vec<Result<AgentReply, String>>,
) -> (SupportAgent, std::sync::Arc<Mutex<Vec<Seen>>>) {
    let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
    let responder = ScriptedResponder {
        replies: Mutex::new(script.into()),
        seen: seen.clone(),
    };
    let catalog = reference_catalog().unwrap();
    let agent = SupportAgent::new(&Config::default(), &catalog, Box::new(responder)).unwrap();
    (agent, seen)
}

#[tokio::test]
async fn first_message_fans_out_then_persona_is_cached() {
    let (agent, seen) = agent(vec![calm("business_exec"), calm("business_exec")]);

    let first = agent.process_message("s1", "what are your pricing plans").await;
    assert!(!first.persona.cached);
    assert_eq!(first.persona.persona, "business_exec");
    assert_eq!(
        first.kb_articles.iter().map(|a| a.article.id).collect::<Vec<_>>(),
        vec![8]
    );
    assert!(!first.escalate);
    assert_eq!(first.metrics.conversation_length, 2);

    let second = agent.process_message("s1", "how much").await;
    assert!(second.persona.cached);
    assert_eq!(second.kb_articles[0].article.id, 8);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[1].message, "how much");
    assert_eq!(seen[1].history_len, 2);
    assert_eq!(seen[1].article_ids, vec![8]);

    let history = agent.history("s1");
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "what are your pricing plans");
    assert_eq!(history[1].content, "reply for business_exec");
}

#[tokio::test]
async fn low_confidence_is_not_cached() {
    let (agent, _) = agent(vec![
        Ok(reply("business_exec", 0.5, Sentiment::Neutral, Urgency::Low)),
        calm("business_exec"),
    ]);
    agent.process_message("s", "what are your pricing plans").await;
    let second = agent.process_message("s", "tell me more").await;
    assert!(!second.persona.cached);
}

#[tokio::test]
async fn negative_sentiment_twice_escalates_with_context() {
    let (agent, _) = agent(vec![
        Ok(reply("frustrated_user", 0.9, Sentiment::Negative, Urgency::Low)),
        Ok(reply("frustrated_user", 0.9, Sentiment::Negative, Urgency::Low)),
    ]);

    let first = agent.process_message("s", "the dashboard is slow").await;
    assert!(!first.escalate);
    assert!(first.escalation_context.is_none());

    let second = agent.process_message("s", "still slow today").await;
    assert!(second.escalate);
    assert_eq!(
        second.escalation_reason.as_deref(),
        Some("Sentiment degraded to negative in recent messages")
    );
    let ctx = second.escalation_context.unwrap();
    assert_eq!(ctx.session_id, "s");
    assert_eq!(ctx.conversation_length, 4);
    assert_eq!(ctx.full_history.len(), 4);
    assert_eq!(ctx.sentiment_history, vec![Sentiment::Negative, Sentiment::Negative]);
}

#[tokio::test]
async fn keyword_escalates_on_first_message() {
    let (agent, _) = agent(vec![calm("frustrated_user")]);
    let resp = agent.process_message("s", "I need to speak to manager now").await;
    assert!(resp.escalate);
    assert_eq!(
        resp.escalation_reason.as_deref(),
        Some("Customer used escalation keywords (manager, legal, cancel, etc.)")
    );
}

#[tokio::test]
async fn long_conversation_escalates() {
    let (agent, _) = agent(vec![
        calm("technical_expert"),
        calm("technical_expert"),
        calm("technical_expert"),
    ]);
    assert!(!agent.process_message("s", "webhooks").await.escalate);
    assert!(!agent.process_message("s", "tokens").await.escalate);
    let third = agent.process_message("s", "limits").await;
    assert!(!third.escalate);

    let (agent, _) = agent_with_history(4).await;
    let resp = agent.process_message("s", "quotas").await;
    assert!(resp.escalate);
    assert_eq!(
        resp.escalation_reason.as_deref(),
        Some("Conversation exceeded 5 exchanges")
    );
}

/// An agent whose session `s` already holds `exchanges` user/agent pairs.
async fn agent_with_history(exchanges: usize) -> (SupportAgent, std::sync::Arc<Mutex<Vec<Seen>>>) {
    let script = (0..=exchanges).map(|_| calm("technical_expert")).collect();
    let (agent, seen) = agent(script);
    for i in 0..exchanges {
        agent.process_message("s", &format!("question{i}")).await;
    }
    (agent, seen)
}

#[tokio::test]
async fn responder_failure_is_graceful() {
    let (agent, _) = agent(vec![Err("connection refused".to_string())]);
    let resp = agent.process_message("s", "hello there").await;

    assert_eq!(resp.persona.persona, "unknown");
    assert_eq!(resp.persona.confidence, 0.0);
    assert!(resp.escalate);
    assert_eq!(
        resp.escalation_reason.as_deref(),
        Some("System error: connection refused")
    );
    assert_eq!(resp.error.as_deref(), Some("connection refused"));
    assert!(resp.response.contains("technical difficulties"));
    assert!(resp.kb_articles.is_empty());

    assert!(agent.history("s").is_empty());
    assert_eq!(agent.total_requests(), 0);
    assert!(agent.metrics_summary().is_none());
}

#[tokio::test]
async fn reset_clears_history_and_persona() {
    let (agent, _) = agent(vec![calm("business_exec"), calm("business_exec")]);
    agent.process_message("s", "what are your pricing plans").await;
    assert_eq!(agent.active_sessions(), 1);

    agent.reset("s");
    assert!(agent.history("s").is_empty());
    assert_eq!(agent.active_sessions(), 0);

    let after = agent.process_message("s", "what are your pricing plans").await;
    assert!(!after.persona.cached);
    assert_eq!(after.metrics.conversation_length, 2);
}

#[tokio::test]
async fn sessions_are_isolated_and_metrics_aggregate() {
    let (agent, _) = agent(vec![calm("business_exec"), calm("technical_expert")]);
    agent.process_message("a", "what are your pricing plans").await;
    agent.process_message("b", "kubernetes operators").await;

    assert_eq!(agent.history("a").len(), 2);
    assert_eq!(agent.history("b").len(), 2);

    let summary = agent.metrics_summary().unwrap();
    assert_eq!(summary.total_requests, 2);
    assert_eq!(summary.kb_hit_rate, 50.0);
    assert_eq!(summary.escalation_rate, 0.0);
    assert_eq!(summary.persona_distribution["technical_expert"], 1);
    assert_eq!(summary.avg_confidence, 0.9);
}
