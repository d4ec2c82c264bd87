//! # Support Agent Core
//!
//! Pure retrieval engine for Support Agent: knowledge-base models, catalog
//! validation, tokenization, per-category TF-IDF indexing, cosine matching,
//! and the retrieval orchestrator.
//!
//! This crate performs no I/O and has no async runtime dependency. All
//! models are immutable once built and can be shared freely across threads.
//!
//! ```rust
//! use support_agent_core::catalog::{Catalog, Category};
//! use support_agent_core::models::Article;
//! use support_agent_core::retrieve::{RetrievalParams, Retriever};
//!
//! let catalog = Catalog::new(vec![Category::new(
//!     "billing",
//!     vec![Article::new(1, "Refund Policy", "Refunds within 30 days.", &["refund"])],
//! )])
//! .unwrap();
//! let retriever = Retriever::new(&catalog, RetrievalParams::default()).unwrap();
//! let hits = retriever.retrieve("billing", "refund policy", &[], 3);
//! assert_eq!(hits[0].article.id, 1);
//! ```

pub mod catalog;
pub mod error;
pub mod index;
pub mod matcher;
pub mod models;
pub mod retrieve;
pub mod text;
