//! Clap derive structures for the `reroutes` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// reroutes -- drive a namespaced reroute instance from the command line
#[derive(Debug, Parser)]
#[command(
    name = "reroutes",
    version,
    about = "Replay navigation scripts and test location patterns",
    long_about = "Runs a reroute instance against an in-memory history.\n\n\
        `replay` feeds a TOML script of navigation intents through the full\n\
        engine and prints the settled state after every step. `match` tests\n\
        paths against a location-changed pattern.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "REROUTES_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a navigation script and print the state after each step
    #[command(alias = "r")]
    Replay(ReplayArgs),

    /// Test paths against a location-changed pattern
    #[command(alias = "m")]
    Match(MatchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Path to the TOML replay script
    pub script: PathBuf,

    /// Instance key (overrides the script)
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Base path to attach at (overrides the script)
    #[arg(long, short = 'b')]
    pub base: Option<String>,

    /// How long to wait for each step to settle, in milliseconds
    #[arg(long)]
    pub settle_timeout_ms: Option<u64>,
}

// ── Match ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Route pattern, e.g. `/users/:id`
    pub pattern: String,

    /// Pathnames to test
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Require the pattern to match through the end of the path
    #[arg(long)]
    pub end: bool,

    /// Disallow a trailing delimiter
    #[arg(long)]
    pub strict: bool,

    /// Match case-sensitively
    #[arg(long)]
    pub sensitive: bool,

    /// Allow the match to begin anywhere in the path
    #[arg(long)]
    pub anywhere: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
