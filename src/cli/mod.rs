//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "collegium",
    version,
    about = "College-information chatbot backend",
    long_about = "Collegium answers free-form visitor questions about a college: it extracts \
                  keywords, runs tiered full-text search with a substring fallback, ranks \
                  curated Q&A suggestions, and learns from click/vote feedback."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/collegium/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one chat query through the pipeline and print the JSON response
    Query {
        /// Tenant auth token
        #[arg(short, long)]
        token: String,

        /// Query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },

    /// Record feedback (click/upvote/downvote) for a Q&A suggestion
    Feedback {
        /// Tenant auth token
        #[arg(short, long)]
        token: String,

        /// Q&A suggestion id the feedback targets
        #[arg(long)]
        target: i64,

        /// Feedback action: click, upvote or downvote
        action: String,

        /// Normalized query the suggestion was served for (for cache
        /// invalidation and the audit log)
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Load tenants, records and Q&A rows from a JSON seed file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },

    /// Show database statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
