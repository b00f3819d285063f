//! Netguard CLI: trigger the training pipeline and run batch predictions.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Netguard: network traffic classification pipeline
#[derive(Parser, Debug)]
#[command(name = "netguard", version, about, long_about = None)]
struct Cli {
    /// Workspace directory; relative paths in the configuration resolve against it
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (defaults to netguard.toml in the workspace)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run ingestion, validation, transformation and model selection
    Train,
    /// Label a CSV file with a trained model
    Predict {
        /// CSV file of raw feature rows
        #[arg(short, long)]
        input: PathBuf,
        /// Model bundle written by `train`
        #[arg(short, long, default_value = "final_model/model.json")]
        model: PathBuf,
        /// Where to write the input plus a predicted_column
        #[arg(short, long, default_value = "prediction_output/output.csv")]
        output: PathBuf,
    },
    /// Insert a CSV file into the configured record store collection
    Push {
        /// CSV file to insert
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Write a seeded synthetic traffic dataset
    GenerateSample {
        /// Number of records
        #[arg(short, long, default_value = "1000")]
        rows: usize,
        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Output CSV path
        #[arg(short, long, default_value = "Network_Data/phishingData.csv")]
        output: PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
    /// Write a default netguard.toml into the workspace
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "netguard", "netguard")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "netguard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let result = match commands::resolve_workspace(&cli.workspace) {
        Ok(workspace) => {
            commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}
