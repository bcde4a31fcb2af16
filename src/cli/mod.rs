//! CLI module for SU_BOT
//!
//! Provides command-line interface parsing for the `subot` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SU_BOT - campus assistant with local and web retrieval
#[derive(Parser, Debug)]
#[command(
    name = "subot",
    version,
    about = "SU_BOT - retrieval-augmented campus assistant",
    long_about = "Answers questions about the college from a local document index,\n\
                  live web search, or both.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a new deployment.",
    after_help = "EXAMPLES:\n    \
                  subot init                          # Scaffold subot.toml and data/\n    \
                  subot index rebuild                 # Build the index from data/corpus\n    \
                  subot ask \"Who is the HOD of IT?\"   # One-off question\n    \
                  subot chat                          # Interactive session\n    \
                  subot                               # Start the server"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "subot.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question
        query: String,
    },

    /// Interactive chat with conversation memory
    Chat,

    /// Manage the segment index
    #[command(subcommand)]
    Index(IndexCommands),

    /// Show configuration information
    Config {
        /// Show the full configuration
        #[arg(short = 'f', long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Scaffold subot.toml, data directories and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,

        /// Web search provider (duckduckgo, tavily or disabled)
        #[arg(long, default_value = "duckduckgo")]
        web_search: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

/// Index management subcommands
#[derive(Subcommand, Debug)]
pub enum IndexCommands {
    /// Re-read the corpus, re-embed and persist the index
    Rebuild,

    /// Show index statistics
    Stats,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
