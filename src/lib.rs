//! # Support Agent
//!
//! A persona-aware customer support agent. Each customer message is matched
//! against a categorised knowledge base with TF-IDF retrieval, answered by an
//! LLM that also classifies the customer's persona, sentiment, and urgency,
//! and checked against escalation rules that decide when a human should take
//! over.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌───────────┐   ┌────────────┐
//! │  Catalog  │──▶│  TF-IDF      │──▶│ Responder │──▶│ Escalation │
//! │ TOML/JSON │   │  Retriever   │   │   (LLM)   │   │   Policy   │
//! └───────────┘   └──────────────┘   └───────────┘   └─────┬──────┘
//!                                                          │
//!                      ┌───────────────────────────────────┤
//!                      ▼                                   ▼
//!                 ┌──────────┐                       ┌──────────┐
//!                 │   CLI    │                       │   HTTP   │
//!                 └──────────┘                       └──────────┘
//! ```
//!
//! The retrieval engine lives in the `support-agent-core` crate; this crate
//! adds configuration, the LLM client, sessions, escalation, metrics, and
//! the CLI/HTTP surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`catalog`] | Reference catalog and catalog files |
//! | [`llm`] | Responder trait, OpenAI client, prompt and reply parsing |
//! | [`session`] | Per-session history and persona state |
//! | [`escalation`] | Human hand-off rules |
//! | [`metrics`] | Request counters and averages |
//! | [`agent`] | The message-processing pipeline |
//! | [`search`] | Direct knowledge-base search |
//! | [`server`] | HTTP API |

pub mod agent;
pub mod catalog;
pub mod config;
pub mod escalation;
pub mod llm;
pub mod metrics;
pub mod search;
pub mod server;
pub mod session;
