//! Per-category TF-IDF vector-space models.
//!
//! # Algorithm
//!
//! For each non-empty category:
//!
//! 1. Build one text blob per article ([`Article::index_text`]).
//! 2. Extract unigram + bigram terms ([`text::terms`]).
//! 3. Count every term across the category corpus and keep the
//!    `max_features` most frequent (ties: lexical order).
//! 4. Renumber the kept terms in lexical order; that order is the
//!    dimension order of every vector.
//! 5. `idf = ln((1 + N) / (1 + df)) + 1` per dimension.
//! 6. Article vector = raw count × idf, L2-normalised.
//!
//! The build is pure: identical input yields identical vocabulary, idf,
//! and vectors.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::Catalog;
use crate::models::Article;
use crate::text;

/// Vector-space model for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<Vec<f64>>,
    articles: Vec<Article>,
}

impl CategoryModel {
    /// Build a model over `articles`. Returns `None` for an empty slice.
    pub fn build(articles: &[Article], max_features: usize) -> Option<Self> {
        if articles.is_empty() {
            return None;
        }

        let doc_terms: Vec<Vec<String>> = articles
            .iter()
            .map(|a| text::terms(&a.index_text()))
            .collect();

        // BTreeMap keeps candidates in lexical order, which the stable sort
        // below relies on for tie-breaking.
        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &doc_terms {
            for term in terms {
                *corpus_counts.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(max_features);

        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let vocabulary: BTreeMap<String, usize> = kept
            .iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();

        let counts: Vec<Vec<f64>> = doc_terms
            .iter()
            .map(|terms| count_vector(&vocabulary, terms))
            .collect();

        let n = articles.len() as f64;
        let idf: Vec<f64> = (0..vocabulary.len())
            .map(|dim| {
                let df = counts.iter().filter(|c| c[dim] > 0.0).count() as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vectors = counts
            .into_iter()
            .map(|mut v| {
                for (x, w) in v.iter_mut().zip(&idf) {
                    *x *= w;
                }
                l2_normalize(&mut v);
                v
            })
            .collect();

        Some(Self {
            vocabulary,
            idf,
            vectors,
            articles: articles.to_vec(),
        })
    }

    /// Term → dimension mapping, iterated in dimension order.
    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// L2-normalised article vectors, indexed like [`articles`](Self::articles).
    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn dims(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Raw term counts projected onto `vocabulary`; unknown terms are dropped.
pub(crate) fn count_vector(vocabulary: &BTreeMap<String, usize>, terms: &[String]) -> Vec<f64> {
    let mut v = vec![0.0; vocabulary.len()];
    for term in terms {
        if let Some(&dim) = vocabulary.get(term) {
            v[dim] += 1.0;
        }
    }
    v
}

/// Scale `v` to unit length. A zero vector is left unchanged.
pub(crate) fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// All category models of one catalog.
///
/// Categories without articles have no model; lookups for them return
/// `None`, which retrieval treats as "no results".
#[derive(Debug, Clone, Default)]
pub struct KnowledgeIndex {
    models: HashMap<String, CategoryModel>,
    order: Vec<String>,
}

impl KnowledgeIndex {
    pub fn build(catalog: &Catalog, max_features: usize) -> Self {
        let mut models = HashMap::new();
        for category in catalog.categories() {
            if let Some(model) = CategoryModel::build(&category.articles, max_features) {
                tracing::debug!(
                    category = %category.name,
                    articles = category.articles.len(),
                    dims = model.dims(),
                    "built category model"
                );
                models.insert(category.name.clone(), model);
            }
        }
        Self {
            models,
            order: catalog.names().map(str::to_string).collect(),
        }
    }

    pub fn model(&self, category: &str) -> Option<&CategoryModel> {
        self.models.get(category)
    }

    /// All catalog category names in declaration order, including empty ones.
    pub fn categories(&self) -> &[String] {
        &self.order
    }

    /// Number of categories that have a model.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}
