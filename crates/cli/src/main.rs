//! HR Analytics CLI
//!
//! A command-line tool for checking the inference service and scoring
//! employees for attrition, performance and retention.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, predict, ModelKind};
use std::path::PathBuf;

/// HR Analytics CLI
#[derive(Parser)]
#[command(name = "hra")]
#[command(author, version, about = "CLI for the HR Analytics inference service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via HRA_API_URL env var)
    #[arg(long, env = "HRA_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health and readiness
    Health,

    /// Score a single employee from a JSON file
    Predict {
        /// Model to invoke
        #[arg(value_enum)]
        kind: ModelKind,

        /// JSON file holding one employee record
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Score every row of a CSV file
    Bulk {
        /// Model to invoke
        #[arg(value_enum)]
        kind: ModelKind,

        /// CSV file with a header row
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(|f| <output::OutputFormat as clap::ValueEnum>::from_str(f, true).ok())
        })
        .unwrap_or_default();

    if cli.verbose {
        output::print_info(&format!("Using API at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => {
            health::show_health(&client, format).await?;
        }
        Commands::Predict { kind, input } => {
            predict::predict_single(&client, kind, &input, format).await?;
        }
        Commands::Bulk { kind, file } => {
            predict::predict_bulk(&client, kind, &file, format).await?;
        }
    }

    Ok(())
}
