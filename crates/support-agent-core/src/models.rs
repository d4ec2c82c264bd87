//! Data types for knowledge-base articles, conversation turns, and
//! scored retrieval results.

use serde::{Deserialize, Serialize};

/// An immutable knowledge-base article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Catalog identifier.
    pub id: i64,
    /// Short title, e.g. `"Pricing & Plans"`.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Declared keywords used for indexing and keyword fallback matching.
    pub keywords: Vec<String>,
}

impl Article {
    pub fn new(id: i64, title: &str, content: &str, keywords: &[&str]) -> Self {
        Self {
            id,
            title: title.to_string(),
            content: content.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// The text blob that gets indexed: title, content, and space-joined keywords.
    pub fn index_text(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.keywords.join(" "))
    }

    /// One-line summary handed to the responder, `"title: content"`.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.title, self.content)
    }
}

/// An [`Article`] copy paired with its similarity to a query.
///
/// Serializes flat: the article fields followed by `relevance_score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    /// Cosine similarity in `[0.0, 1.0]`.
    pub relevance_score: f64,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Agent,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_text_joins_all_fields() {
        let a = Article::new(1, "Rate Limits", "1000 req/hour.", &["rate", "quota"]);
        assert_eq!(a.index_text(), "Rate Limits 1000 req/hour. rate quota");
    }

    #[test]
    fn test_scored_article_serializes_flat() {
        let scored = ScoredArticle {
            article: Article::new(8, "Pricing & Plans", "Starter: $49/mo", &["pricing"]),
            relevance_score: 0.5,
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["id"], 8);
        assert_eq!(json["title"], "Pricing & Plans");
        assert_eq!(json["relevance_score"], 0.5);
    }

    #[test]
    fn test_role_accepts_assistant_alias() {
        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(turn.role, Role::Agent);
        let out = serde_json::to_string(&turn).unwrap();
        assert!(out.contains(r#""role":"agent""#));
    }
}
