use anyhow::Result;
use clap::{Parser, Subcommand};
use forager::cli::{probe_cmd, run_cmd};
use forager::config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forager", version, about = "Resilient product-listing scraper")]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search every term in the input file and write the result dataset.
    Run {
        /// CSV file with an "Item Name" column.
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output CSV file.
        #[arg(short, long, value_name = "FILE", default_value = "results.csv")]
        output: PathBuf,

        /// Directory for downloaded product images.
        #[arg(long, value_name = "DIR")]
        images: Option<PathBuf>,

        /// Minimum match score (0-100) a candidate must reach.
        #[arg(long, value_name = "N")]
        threshold: Option<u8>,

        /// Per-term result cap.
        #[arg(long, value_name = "N")]
        max_results: Option<usize>,

        /// Seed for the pacing randomness, for reproducible runs.
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,
    },
    /// Search a single term and print the scored matches.
    Probe {
        term: String,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        /// Minimum match score (0-100) a candidate must reach.
        #[arg(long, value_name = "N")]
        threshold: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("forager=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Run {
            input,
            output,
            images,
            threshold,
            max_results,
            seed,
        } => {
            if let Some(dir) = images {
                config.paths.image_dir = dir;
            }
            if let Some(threshold) = threshold {
                config.match_threshold = threshold;
            }
            if let Some(cap) = max_results {
                config.max_results = cap;
            }
            run_cmd::run(config, &input, &output, seed).await
        }
        Command::Probe {
            term,
            json,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                config.match_threshold = threshold;
            }
            probe_cmd::run(config, &term, json).await
        }
    }
}
