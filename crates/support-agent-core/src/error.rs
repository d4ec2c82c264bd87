//! Error types for the `support-agent-core` crate.

use thiserror::Error;

/// Errors raised while validating a knowledge-base catalog.
///
/// These are construction-time failures: a catalog that fails validation
/// never produces an index.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// A required article field is absent.
    #[error("catalog category '{category}', article #{position}: missing required field '{field}'")]
    MissingField {
        /// Category the article belongs to.
        category: String,
        /// Zero-based position of the article within its category.
        position: usize,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A category has an empty or whitespace-only name.
    #[error("catalog category #{position} has a blank name")]
    BlankCategory {
        /// Zero-based position of the category within the catalog.
        position: usize,
    },

    /// Two categories share the same name.
    #[error("catalog category '{0}' is declared more than once")]
    DuplicateCategory(String),
}

/// Errors raised when retrieval parameters are inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    /// The relevance floor lies outside `[0.0, 1.0)`.
    #[error("relevance_floor ({0}) must be in [0.0, 1.0)")]
    RelevanceFloor(f64),

    /// The vocabulary cap is zero.
    #[error("max_features must be greater than zero")]
    MaxFeatures,

    /// The context window is zero.
    #[error("context_window must be greater than zero")]
    ContextWindow,
}

/// A convenience result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
