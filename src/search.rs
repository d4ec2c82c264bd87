//! Knowledge-base search shared by the CLI (`support-agent search`) and the
//! HTTP API (`POST /api/search`).
//!
//! Two modes are supported:
//!
//! - **tfidf**: cosine ranking against the per-category TF-IDF index, with
//!   the optional conversation history folded into the query.
//! - **keyword**: substring counting over each article's keyword list.
//!
//! Without a category, every category is searched and the hits are merged.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use support_agent_core::models::{Article, Turn};
use support_agent_core::retrieve::Retriever;

use crate::catalog::resolve_catalog;
use crate::config::Config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Tfidf,
    Keyword,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub mode: SearchMode,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub category: String,
    #[serde(flatten)]
    pub article: Article,
    /// Cosine score; absent for keyword matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Run a search. A blank query or an unknown category yields no hits.
pub fn search(
    retriever: &Retriever,
    default_top_k: usize,
    req: &SearchRequest,
) -> Vec<SearchHit> {
    if req.query.trim().is_empty() {
        return Vec::new();
    }

    let known = retriever.categories();
    let categories: Vec<String> = match &req.category {
        Some(c) if known.iter().any(|k| k == c) => vec![c.clone()],
        Some(c) => {
            tracing::debug!(category = %c, "search in unknown category");
            return Vec::new();
        }
        None => known,
    };

    let mut hits = Vec::new();
    match req.mode {
        SearchMode::Tfidf => {
            let top_k = req.top_k.unwrap_or(default_top_k);
            for category in &categories {
                for scored in retriever.retrieve(category, &req.query, &req.history, top_k) {
                    hits.push(SearchHit {
                        category: category.clone(),
                        article: scored.article,
                        relevance_score: Some(scored.relevance_score),
                    });
                }
            }
            // Stable: equal scores keep category order.
            hits.sort_by(|a, b| {
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            hits.truncate(top_k);
        }
        SearchMode::Keyword => {
            for category in &categories {
                for article in retriever.keyword_matches(category, &req.query) {
                    hits.push(SearchHit {
                        category: category.clone(),
                        article,
                        relevance_score: None,
                    });
                }
            }
            if let Some(k) = req.top_k {
                hits.truncate(k);
            }
        }
    }

    tracing::debug!(
        query = %req.query,
        mode = ?req.mode,
        hits = hits.len(),
        "search complete"
    );
    hits
}

/// CLI entry point: build the index from configuration and print results.
///
/// Each `context` entry is treated as an earlier customer message.
pub fn run_search(
    config: &Config,
    query: &str,
    category: Option<String>,
    top_k: Option<usize>,
    keyword: bool,
    context: Vec<String>,
) -> Result<()> {
    let catalog = resolve_catalog(config)?;
    let retriever = Retriever::new(&catalog, config.retrieval.params())?;

    let req = SearchRequest {
        query: query.to_string(),
        category,
        top_k,
        history: context.into_iter().map(Turn::user).collect(),
        mode: if keyword {
            SearchMode::Keyword
        } else {
            SearchMode::Tfidf
        },
    };
    let hits = search(&retriever, config.retrieval.top_k, &req);

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        match hit.relevance_score {
            Some(score) => println!(
                "{}. [{:.3}] {} / {}",
                i + 1,
                score,
                hit.category,
                hit.article.title
            ),
            None => println!("{}. {} / {}", i + 1, hit.category, hit.article.title),
        }
        println!("    id: {}", hit.article.id);
        println!("    keywords: {}", hit.article.keywords.join(", "));
        println!("    excerpt: \"{}\"", hit.article.content.trim());
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::reference_catalog;
    use support_agent_core::retrieve::RetrievalParams;

    fn retriever() -> Retriever {
        Retriever::new(&reference_catalog().unwrap(), RetrievalParams::default()).unwrap()
    }

    fn req(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_tfidf_within_category() {
        let hits = search(
            &retriever(),
            3,
            &SearchRequest {
                category: Some("business_exec".into()),
                ..req("what are your pricing plans")
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article.id, 8);
        assert_eq!(hits[0].category, "business_exec");
    }

    #[test]
    fn test_tfidf_across_categories() {
        let hits = search(&retriever(), 3, &req("enterprise pricing"));
        let ids: Vec<i64> = hits.iter().map(|h| h.article.id).collect();
        assert_eq!(ids, vec![8, 3]);
        assert_eq!(hits[1].category, "technical_expert");
    }

    #[test]
    fn test_keyword_mode() {
        let hits = search(
            &retriever(),
            3,
            &SearchRequest {
                mode: SearchMode::Keyword,
                ..req("I want a refund, this is broken")
            },
        );
        let ids: Vec<i64> = hits.iter().map(|h| h.article.id).collect();
        assert_eq!(ids, vec![4, 6]);
        assert!(hits.iter().all(|h| h.relevance_score.is_none()));
    }

    #[test]
    fn test_unknown_category_and_empty_query_find_nothing() {
        let r = retriever();
        let unknown = SearchRequest {
            category: Some("nope".into()),
            ..req("pricing")
        };
        assert!(search(&r, 3, &unknown).is_empty());
        assert!(search(&r, 3, &req("   ")).is_empty());
        let blank_keyword = SearchRequest {
            mode: SearchMode::Keyword,
            ..req("")
        };
        assert!(search(&r, 3, &blank_keyword).is_empty());
    }

    #[test]
    fn test_mode_deserializes_lowercase() {
        let r: SearchRequest =
            serde_json::from_str(r#"{"query":"x","mode":"keyword","top_k":2}"#).unwrap();
        assert_eq!(r.mode, SearchMode::Keyword);
        assert_eq!(r.top_k, Some(2));
        let r: SearchRequest = serde_json::from_str(r#"{"query":"x"}"#).unwrap();
        assert_eq!(r.mode, SearchMode::Tfidf);
    }
}
