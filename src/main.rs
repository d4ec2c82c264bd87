//! # Support Agent CLI (`support-agent`)
//!
//! ## Usage
//!
//! ```bash
//! support-agent --config ./config/agent.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `support-agent serve` | Start the HTTP API |
//! | `support-agent search "<query>"` | Search the knowledge base |
//! | `support-agent catalog` | List categories and articles |
//! | `support-agent chat` | Interactive chat session on stdin |
//!
//! ## Examples
//!
//! ```bash
//! # Rank articles in one category
//! support-agent search "what are your pricing plans" --category business_exec
//!
//! # Fold earlier customer messages into the query
//! support-agent search "how much" --category business_exec --context "enterprise pricing"
//!
//! # Keyword fallback across all categories
//! support-agent search "refund now" --keyword
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use support_agent::agent::SupportAgent;
use support_agent::config::{self, Config};

/// Support Agent: persona-aware customer support with TF-IDF knowledge-base
/// retrieval and escalation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file is absent, built-in defaults and the reference
/// catalog are used.
#[derive(Parser)]
#[command(name = "support-agent", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/agent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Search the knowledge base.
    ///
    /// Without `--category`, every category is searched and the hits merged.
    Search {
        /// The search query string.
        query: String,

        /// Restrict the search to one category.
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of results.
        #[arg(long)]
        top_k: Option<usize>,

        /// Use keyword matching instead of TF-IDF ranking.
        #[arg(long)]
        keyword: bool,

        /// Earlier customer message to fold into the query (repeatable).
        #[arg(long)]
        context: Vec<String>,
    },

    /// List catalog categories and articles.
    Catalog,

    /// Chat with the agent on stdin, one message per line.
    Chat {
        /// Session identifier; a random one is generated when omitted.
        #[arg(long)]
        session: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file, falling back to defaults when it does not exist.
fn load(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

async fn run_chat(cfg: &Config, session: Option<String>) -> Result<()> {
    let agent = SupportAgent::from_config(cfg)?;
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    println!("Session {} (empty line or Ctrl-D to quit)", session_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        let reply = agent.process_message(&session_id, line.trim()).await;
        println!(
            "[{} {:.2} {}/{}] {}",
            reply.persona.persona,
            reply.persona.confidence,
            reply.persona.sentiment.as_str(),
            reply.persona.urgency.as_str(),
            reply.response
        );
        for hit in &reply.kb_articles {
            println!("    kb: {} ({:.3})", hit.article.title, hit.relevance_score);
        }
        if let Some(reason) = &reply.escalation_reason {
            println!("    ESCALATE: {}", reason);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Serve => support_agent::server::run_server(&cfg).await?,
        Commands::Search {
            query,
            category,
            top_k,
            keyword,
            context,
        } => support_agent::search::run_search(&cfg, &query, category, top_k, keyword, context)?,
        Commands::Catalog => support_agent::catalog::list_catalog(&cfg)?,
        Commands::Chat { session } => run_chat(&cfg, session).await?,
    }

    Ok(())
}
