//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// social-daemon: post one message to every enabled platform on a schedule
#[derive(Parser, Debug)]
#[command(name = "social-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the posting loop until halted or interrupted
    Run(RunArgs),

    /// Fan out one fixed message and exit
    Post(PostArgs),

    /// Inspect the content pool
    Content(ContentArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

/// Flags shared by commands that send
#[derive(Args, Debug, Clone, Default)]
pub struct SendArgs {
    /// Write posts to the outbox file instead of publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Replace every enabled sender with an always-succeeding stub
    #[arg(long, conflicts_with = "dry_run")]
    pub offline: bool,

    /// Outbox path for --dry-run (overrides general.outbox_path)
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub send: SendArgs,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Disable mood-based interval jitter
    #[arg(long)]
    pub no_mood: bool,

    /// Seed for content selection and mood (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    #[command(flatten)]
    pub send: SendArgs,

    /// Message text
    #[arg(long)]
    pub text: String,

    /// Title for platforms that need one
    #[arg(long)]
    pub title: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ContentArgs {
    #[command(subcommand)]
    pub command: ContentCommands,
}

#[derive(Subcommand, Debug)]
pub enum ContentCommands {
    /// List all posts in the pool
    List {
        /// Override content.pool_path
        #[arg(long)]
        pool: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the pool against every enabled platform's limit
    Validate {
        /// Override content.pool_path
        #[arg(long)]
        pool: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration and content pool
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
