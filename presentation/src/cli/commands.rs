//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for repo-lens
#[derive(Parser, Debug)]
#[command(name = "repo-lens")]
#[command(author, version, about = "Explain a GitHub repository with an LLM that reads its code")]
#[command(long_about = r#"
repo-lens lets a language model explore a repository through inspection tools
(directory listings, file reads, repository tree) and streams its progress
until it produces a structured report: summary, modules, highlights and
design principles. Reports can be exported as Markdown documents.

Configuration files are loaded from (in priority order):
1. --config <path>                         Explicit config file
2. ./repo-lens.toml or ./.repo-lens.toml   Project-level config
3. ~/.config/repo-lens/config.toml         Global config
4. REPO_LENS_* environment variables       (nested keys with __)

Example:
  repo-lens serve
  repo-lens analyze https://github.com/tokio-rs/axum --language ja
  repo-lens analyze https://github.com/tokio-rs/axum --json > analysis.json
  repo-lens export analysis.json --repo-url https://github.com/tokio-rs/axum --wait
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyze one repository in the terminal
    Analyze {
        /// Repository URL, e.g. https://github.com/owner/name
        repo_url: String,

        /// Report language tag (en, zh, ja, pt-BR ...)
        #[arg(short, long)]
        language: Option<String>,

        /// Model provider (openai, openrouter, gemini)
        #[arg(long)]
        provider: Option<String>,

        /// Model name for the selected provider
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Print events as JSON lines instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Render a saved analysis result into a report document
    Export {
        /// JSON file holding the analysis result
        analysis: PathBuf,

        /// Repository the analysis belongs to
        #[arg(long)]
        repo_url: String,

        /// Project name used for the document title and file name
        #[arg(long)]
        project_name: Option<String>,

        /// Wait for the job to finish and print the artifact path
        #[arg(long)]
        wait: bool,
    },

    /// Show configuration file locations
    Config,
}
