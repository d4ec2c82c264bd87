//! Retrieval orchestrator: context enrichment, ranking, top-k selection,
//! and relevance filtering over a [`KnowledgeIndex`].
//!
//! # Ranking
//!
//! 1. Append the last `context_user_turns` user messages found in the last
//!    `context_window` turns of history to the query.
//! 2. Score every article of the category ([`matcher::score_all`]).
//! 3. Sort by score descending; equal scores keep catalog order.
//! 4. Truncate to `top_k`.
//! 5. Drop results whose score is `<= relevance_floor`.
//!
//! Fewer than `top_k` results, including none, is a normal outcome.
//!
//! # Rebuilds
//!
//! The current index sits behind `RwLock<Arc<_>>`. [`Retriever::rebuild`]
//! builds the replacement completely before taking the write lock, and
//! readers work on a cloned `Arc`, so no reader ever sees a partial index.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::ParamsError;
use crate::index::KnowledgeIndex;
use crate::matcher;
use crate::models::{Article, Role, ScoredArticle, Turn};

/// Retrieval tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalParams {
    /// Vocabulary cap per category.
    pub max_features: usize,
    /// Results scoring at or below this value are discarded.
    pub relevance_floor: f64,
    /// Number of trailing history turns inspected for context.
    pub context_window: usize,
    /// Number of user turns (from that window) appended to the query.
    pub context_user_turns: usize,
    /// Maximum results of [`Retriever::keyword_matches`].
    pub keyword_limit: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            max_features: 100,
            relevance_floor: 0.1,
            context_window: 4,
            context_user_turns: 2,
            keyword_limit: 3,
        }
    }
}

impl RetrievalParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(0.0..1.0).contains(&self.relevance_floor) {
            return Err(ParamsError::RelevanceFloor(self.relevance_floor));
        }
        if self.max_features == 0 {
            return Err(ParamsError::MaxFeatures);
        }
        if self.context_window == 0 {
            return Err(ParamsError::ContextWindow);
        }
        Ok(())
    }
}

/// Append recent user messages from `history` to `query`.
///
/// Returns `query` unchanged when history is empty.
pub fn enrich_query(query: &str, history: &[Turn], params: &RetrievalParams) -> String {
    if history.is_empty() {
        return query.to_string();
    }
    let window = &history[history.len().saturating_sub(params.context_window)..];
    let user: Vec<&str> = window
        .iter()
        .filter(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
        .collect();
    let recent = &user[user.len().saturating_sub(params.context_user_turns)..];
    format!("{} {}", query, recent.join(" "))
}

/// Thread-safe retrieval entry point over a swappable [`KnowledgeIndex`].
#[derive(Debug)]
pub struct Retriever {
    params: RetrievalParams,
    index: RwLock<Arc<KnowledgeIndex>>,
}

impl Retriever {
    pub fn new(catalog: &Catalog, params: RetrievalParams) -> Result<Self, ParamsError> {
        params.validate()?;
        let index = KnowledgeIndex::build(catalog, params.max_features);
        tracing::info!(
            categories = index.categories().len(),
            models = index.model_count(),
            articles = catalog.article_count(),
            "knowledge index built"
        );
        Ok(Self {
            params,
            index: RwLock::new(Arc::new(index)),
        })
    }

    /// The index currently in use.
    pub fn snapshot(&self) -> Arc<KnowledgeIndex> {
        self.index
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the index with one built from `catalog`.
    pub fn rebuild(&self, catalog: &Catalog) {
        let fresh = Arc::new(KnowledgeIndex::build(catalog, self.params.max_features));
        let mut slot = self
            .index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = fresh;
        tracing::info!(articles = catalog.article_count(), "knowledge index swapped");
    }

    /// Category names in catalog order.
    pub fn categories(&self) -> Vec<String> {
        self.snapshot().categories().to_vec()
    }

    /// Rank the articles of `category` against `query` enriched with `history`.
    pub fn retrieve(
        &self,
        category: &str,
        query: &str,
        history: &[Turn],
        top_k: usize,
    ) -> Vec<ScoredArticle> {
        let index = self.snapshot();
        self.rank(&index, category, query, history, top_k)
    }

    /// Retrieve up to `per_category` results from every category, then keep
    /// the best `limit` overall. Equal scores keep category order.
    ///
    /// Every category is scored against the same snapshot, so a concurrent
    /// [`Retriever::rebuild`] never mixes two indexes in one result.
    pub fn retrieve_across(
        &self,
        query: &str,
        history: &[Turn],
        per_category: usize,
        limit: usize,
    ) -> Vec<ScoredArticle> {
        let index = self.snapshot();
        let mut all: Vec<ScoredArticle> = index
            .categories()
            .iter()
            .flat_map(|c| self.rank(&index, c, query, history, per_category))
            .collect();
        all.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all.truncate(limit);
        all
    }

    fn rank(
        &self,
        index: &KnowledgeIndex,
        category: &str,
        query: &str,
        history: &[Turn],
        top_k: usize,
    ) -> Vec<ScoredArticle> {
        let Some(model) = index.model(category) else {
            return Vec::new();
        };

        let enriched = enrich_query(query, history, &self.params);
        let scores = matcher::score_all(model, &enriched);

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let results: Vec<ScoredArticle> = order
            .into_iter()
            .take(top_k)
            .filter(|&i| scores[i] > self.params.relevance_floor)
            .map(|i| ScoredArticle {
                article: model.articles()[i].clone(),
                relevance_score: scores[i],
            })
            .collect();

        tracing::debug!(category, top_k, result_count = results.len(), "retrieve");
        results
    }

    /// Keyword fallback: rank articles by how many of their declared keywords
    /// occur as substrings of the lower-cased query.
    ///
    /// Articles with no hit are omitted; equal counts keep catalog order.
    pub fn keyword_matches(&self, category: &str, query: &str) -> Vec<Article> {
        let index = self.snapshot();
        let Some(model) = index.model(category) else {
            return Vec::new();
        };
        let lowered = query.to_lowercase();

        let mut scored: Vec<(usize, &Article)> = model
            .articles()
            .iter()
            .map(|a| {
                let hits = a
                    .keywords
                    .iter()
                    .filter(|k| lowered.contains(k.as_str()))
                    .count();
                (hits, a)
            })
            .filter(|(hits, _)| *hits > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(self.params.keyword_limit)
            .map(|(_, a)| a.clone())
            .collect()
    }
}
