//! Knowledge-base catalog sources: the built-in reference catalog and
//! TOML/JSON catalog files.
//!
//! # File format
//!
//! ```toml
//! [[categories]]
//! name = "technical_expert"
//!
//! [[categories.articles]]
//! id = 1
//! title = "API Authentication"
//! content = "Use Bearer tokens in Authorization header."
//! keywords = ["api", "auth"]
//! ```
//!
//! JSON files use the same shape (`{"categories": [...]}`). Entries are
//! validated by [`Catalog::from_entries`]; a missing field aborts loading.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use support_agent_core::catalog::{Catalog, Category, CategoryEntry};
use support_agent_core::models::Article;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    categories: Vec<CategoryEntry>,
}

/// Load the catalog named in `[catalog].path`, or the reference catalog.
pub fn resolve_catalog(config: &Config) -> Result<Catalog> {
    match &config.catalog.path {
        Some(path) => load_catalog(path),
        None => reference_catalog(),
    }
}

/// Parse and validate a catalog file. The format follows the extension
/// (`.toml` or `.json`).
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

    let file: CatalogFile = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?,
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?,
        _ => bail!(
            "Unsupported catalog format: {}. Use a .toml or .json file.",
            path.display()
        ),
    };

    let catalog = Catalog::from_entries(file.categories)
        .with_context(|| format!("Invalid catalog file: {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        categories = catalog.categories().len(),
        articles = catalog.article_count(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// The three-persona reference knowledge base.
pub fn reference_catalog() -> Result<Catalog> {
    let categories = vec![
        Category::new(
            "technical_expert",
            vec![
                Article::new(
                    1,
                    "API Authentication",
                    "Use Bearer tokens in Authorization header. Generate tokens via /api/auth/token endpoint with client_id and client_secret. Tokens expire after 24 hours.",
                    &["api", "auth", "authentication", "token", "bearer", "oauth"],
                ),
                Article::new(
                    2,
                    "Webhook Configuration",
                    "Configure webhooks at /api/webhooks. Supports POST requests with HMAC-SHA256 signatures. Retry logic: 3 attempts with exponential backoff (1s, 2s, 4s).",
                    &["webhook", "callback", "event", "integration", "hmac"],
                ),
                Article::new(
                    3,
                    "Rate Limits",
                    "Standard tier: 1000 req/hour. Enterprise: 10000 req/hour. Headers: X-RateLimit-Remaining, X-RateLimit-Reset. Use exponential backoff when rate limited.",
                    &["rate", "limit", "throttle", "quota", "429"],
                ),
            ],
        ),
        Category::new(
            "frustrated_user",
            vec![
                Article::new(
                    4,
                    "Quick Fixes",
                    "Most common issues resolved by: 1) Clear browser cache and cookies 2) Check internet connection 3) Log out and back in 4) Update to latest version 5) Disable browser extensions",
                    &["not working", "broken", "error", "fix", "help", "issue"],
                ),
                Article::new(
                    5,
                    "Service Status",
                    "Check status.ourservice.com for real-time system status. Current uptime: 99.97%. Subscribe for SMS/email alerts about outages.",
                    &["down", "outage", "status", "unavailable", "slow"],
                ),
                Article::new(
                    6,
                    "Refund Policy",
                    "30-day money back guarantee, no questions asked. Refunds processed within 5-7 business days to original payment method. Contact billing@ourservice.com",
                    &["refund", "money back", "cancel", "unsatisfied", "return"],
                ),
            ],
        ),
        Category::new(
            "business_exec",
            vec![
                Article::new(
                    7,
                    "ROI & Metrics",
                    "Average customers see 40% efficiency gain within 3 months. 99.9% uptime SLA. Enterprise analytics dashboard with custom KPIs. Typical payback period: 6-8 months.",
                    &["roi", "metrics", "analytics", "kpi", "performance", "value"],
                ),
                Article::new(
                    8,
                    "Pricing & Plans",
                    "Starter: $49/mo (up to 5 users), Professional: $149/mo (up to 25 users), Enterprise: Custom pricing. Volume discounts: 10% off for 50+ seats, 20% off for 200+ seats. Annual billing saves 15%.",
                    &["pricing", "cost", "price", "plan", "subscription", "discount"],
                ),
                Article::new(
                    9,
                    "Security & Compliance",
                    "SOC 2 Type II certified. GDPR and CCPA compliant. HIPAA available for Enterprise. Data encrypted at rest (AES-256) and in transit (TLS 1.3). Annual penetration testing.",
                    &["security", "compliance", "gdpr", "hipaa", "encryption", "audit"],
                ),
            ],
        ),
    ];
    Catalog::new(categories).context("reference catalog is invalid")
}

/// Print every category and its articles.
pub fn list_catalog(config: &Config) -> Result<()> {
    let catalog = resolve_catalog(config)?;
    for category in catalog.categories() {
        println!("{} ({} articles)", category.name, category.articles.len());
        for article in &category.articles {
            println!("  [{}] {} ({})", article.id, article.title, article.keywords.join(", "));
        }
    }
    Ok(())
}
