//! Query projection and cosine scoring against a [`CategoryModel`].

use crate::index::{count_vector, l2_normalize, CategoryModel};
use crate::text;

/// Project `query` into the model's vector space.
///
/// Out-of-vocabulary terms are dropped. The result is L2-normalised, or all
/// zeros when no query term is in the vocabulary.
pub fn project(model: &CategoryModel, query: &str) -> Vec<f64> {
    let terms = text::terms(query);
    let mut v = count_vector(model.vocabulary(), &terms);
    for (x, w) in v.iter_mut().zip(model.idf()) {
        *x *= w;
    }
    l2_normalize(&mut v);
    v
}

/// Cosine similarity in `[0.0, 1.0]`; `0.0` when either vector has zero norm
/// or the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if mag_a < f64::EPSILON || mag_b < f64::EPSILON {
        return 0.0;
    }
    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}

/// Score every article of the model against `query`, in article order.
pub fn score_all(model: &CategoryModel, query: &str) -> Vec<f64> {
    let q = project(model, query);
    model
        .vectors()
        .iter()
        .map(|doc| cosine_similarity(&q, doc))
        .collect()
}
