//! # revgraph CLI Module
//!
//! This module implements the CLI interface for revgraph.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store status
//! - `fetch` - Project the walk from a root entity
//! - `import` - Resolve a record file into the store
//! - `export` - Write stored records to a file
//! - `registry` - Show the relation declaration table
//! - `init` - Initialize new database

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use revgraph_core::{Depth, EntityId, RevgraphError, primitives::DEFAULT_WALK_DEPTH};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// revgraph - depth-bounded entity graph transfer for model reviews
#[derive(Parser, Debug)]
#[command(name = "revgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database
    #[arg(short = 'D', long, global = true, default_value = "revgraph.redb")]
    pub database: PathBuf,

    /// Storage backend: "file" (binary record batch) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set.
    #[must_use]
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "revgraph=debug,revgraph_core=debug,tower_http=debug"
        } else {
            "revgraph=info,revgraph_core=info,tower_http=debug"
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store status
    Status,

    /// Project the walk from a root entity
    Fetch {
        /// Root entity identifier (UUID)
        #[arg(short, long)]
        root: EntityId,

        /// Walk budget; negative selects nothing
        #[arg(short, long, default_value_t = DEFAULT_WALK_DEPTH, allow_negative_numbers = true)]
        depth: Depth,

        /// Write the records to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a record file and merge it into the store
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (json, batch)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Export stored records
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (batch, json)
        #[arg(short = 't', long, default_value = "batch")]
        format: String,
    },

    /// Show the relation declaration table
    Registry,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), RevgraphError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            let mut server = config.server;
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }
            cmd_server(&cli.database, backend, &server).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, json_mode),
        Some(Commands::Fetch {
            root,
            depth,
            output,
        }) => cmd_fetch(
            &cli.database,
            backend,
            root,
            depth.min(config.server.max_depth),
            output.as_deref(),
        ),
        Some(Commands::Import { input, format }) => {
            cmd_import(&cli.database, backend, json_mode, &input, &format)
        }
        Some(Commands::Export { output, format }) => {
            cmd_export(&cli.database, backend, &output, &format)
        }
        Some(Commands::Registry) => cmd_registry(json_mode),
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, force),
        None => cmd_status(&cli.database, backend, json_mode),
    }
}
