//! Knowledge-base catalog: persona categories and their articles.
//!
//! A [`Catalog`] is an ordered list of [`Category`] values. Category order is
//! preserved because multi-category retrieval walks categories in
//! declaration order, and ties between categories keep that order.
//!
//! Catalogs authored outside the program arrive as [`CategoryEntry`] /
//! [`ArticleEntry`] records whose fields are all optional, so that a missing
//! field can be reported precisely instead of surfacing as a generic
//! deserialization failure. [`Catalog::from_entries`] validates them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::models::Article;

/// A persona category and the articles it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub name: String,
    pub articles: Vec<Article>,
}

impl Category {
    pub fn new(name: impl Into<String>, articles: Vec<Article>) -> Self {
        Self {
            name: name.into(),
            articles,
        }
    }
}

/// A validated, ordered set of categories.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Catalog {
    categories: Vec<Category>,
}

/// Unvalidated article record as read from a catalog file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ArticleEntry {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Unvalidated category record as read from a catalog file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CategoryEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub articles: Vec<ArticleEntry>,
}

impl Catalog {
    /// Build a catalog, rejecting blank or duplicate category names.
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (position, category) in categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                return Err(CatalogError::BlankCategory { position });
            }
            if !seen.insert(category.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.name.clone()));
            }
        }
        Ok(Self { categories })
    }

    /// Validate raw catalog records, failing on the first missing field.
    pub fn from_entries(entries: Vec<CategoryEntry>) -> Result<Self> {
        let mut categories = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut articles = Vec::with_capacity(entry.articles.len());
            for (position, raw) in entry.articles.into_iter().enumerate() {
                let missing = |field: &'static str| CatalogError::MissingField {
                    category: entry.name.clone(),
                    position,
                    field,
                };
                articles.push(Article {
                    id: raw.id.ok_or_else(|| missing("id"))?,
                    title: raw.title.ok_or_else(|| missing("title"))?,
                    content: raw.content.ok_or_else(|| missing("content"))?,
                    keywords: raw.keywords.ok_or_else(|| missing("keywords"))?,
                });
            }
            categories.push(Category::new(entry.name, articles));
        }
        Self::new(categories)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Category names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn article_count(&self) -> usize {
        self.categories.iter().map(|c| c.articles.len()).sum()
    }
}
