//! # revgraph - Model Review Record Server
//!
//! The main binary for the revgraph projection and resolution engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) carrying transfer records as JSON
//! - CLI interface for store operations
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │             apps/revgraph (THE BINARY)           │
//! │                                                  │
//! │   ┌─────────────┐          ┌─────────────┐       │
//! │   │    CLI      │          │  HTTP API   │       │
//! │   │   (clap)    │          │   (axum)    │       │
//! │   └──────┬──────┘          └──────┬──────┘       │
//! │          └───────────┬────────────┘              │
//! │                      ▼                           │
//! │              ┌───────────────┐                   │
//! │              │ revgraph-core │                   │
//! │              │  (THE ENGINE) │                   │
//! │              └───────────────┘                   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! revgraph server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! revgraph status
//! revgraph import -i records.json
//! revgraph fetch -r 6f1c2b1e-6a0e-4e0b-9a57-0d6f1f2f3a4b -d 2
//! ```

use clap::Parser;
use revgraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // REVGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("REVGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.default_log_filter().into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  revgraph v{}

  Depth-bounded record transfer for model reviews
"#,
        env!("CARGO_PKG_VERSION")
    );
}
