//! Heart Risk Predictor CLI
//!
//! A command-line tool for scoring patient records against a local model
//! file, inspecting the feature schema, and submitting records to a running
//! prediction service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, schema, submit};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Heart Risk Predictor CLI
#[derive(Parser)]
#[command(name = "hrp")]
#[command(author, version, about = "CLI for Heart Risk Predictor", long_about = None)]
pub struct Cli {
    /// Prediction service URL (can also be set via HRP_API_URL env var)
    #[arg(long, env = "HRP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a patient record with a local model file
    Predict {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        record: RecordArgs,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Fill fields missing from the record with reference medians
        #[arg(long, requires = "reference")]
        fill_defaults: bool,
    },

    /// Show the ordered feature schema with domains and defaults
    Schema {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Fetch the schema from the prediction service instead
        #[arg(long, conflicts_with = "reference")]
        remote: bool,
    },

    /// Submit a patient record to the prediction service
    Submit {
        #[command(flatten)]
        record: RecordArgs,
    },
}

/// Model artifact and how to read it
#[derive(clap::Args)]
pub struct ModelArgs {
    /// Model artifact (.onnx or logistic .json)
    #[arg(long, short, env = "HRP_MODEL")]
    pub model: Option<PathBuf>,

    /// Artifact format, inferred from the extension by default
    #[arg(long, value_enum, default_value = "auto")]
    pub model_format: ModelFormatArg,

    /// Expected hex SHA-256 of the artifact
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Feature count the ONNX graph expects (default 13)
    #[arg(long)]
    pub input_width: Option<usize>,

    /// ONNX output index of the predicted label (default 0)
    #[arg(long)]
    pub label_output: Option<usize>,

    /// ONNX output index of the class probabilities (default 1)
    #[arg(long)]
    pub probability_output: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelFormatArg {
    Auto,
    Onnx,
    Logistic,
}

/// Where a patient record comes from
#[derive(clap::Args)]
pub struct RecordArgs {
    /// JSON file holding an object of field name to number
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Set a single field, e.g. --set age=45 (repeatable, overrides --input)
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,
}

/// Where the feature schema comes from
#[derive(clap::Args)]
pub struct SchemaArgs {
    /// Reference dataset (CSV) whose header defines the feature order
    #[arg(long, short)]
    pub reference: Option<PathBuf>,

    /// Label column to drop from the reference dataset
    #[arg(long, default_value = "target")]
    pub label_column: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }

    let settings = config::Config::load()?;
    let api_url = cli
        .api_url
        .or(settings.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    match cli.command {
        Commands::Predict {
            model,
            record,
            schema,
            fill_defaults,
        } => {
            let model = model.to_settings(settings.model_path)?;
            predict::run_local(&model, &record, &schema, fill_defaults, cli.format)?;
        }
        Commands::Schema { schema, remote } => {
            if remote {
                let client = client::ApiClient::new(&api_url)?;
                schema::show_remote(&client, cli.format).await?;
            } else {
                schema::show_local(&schema, cli.format)?;
            }
        }
        Commands::Submit { record } => {
            let client = client::ApiClient::new(&api_url)?;
            submit::submit_record(&client, &record, cli.format).await?;
        }
    }

    Ok(())
}
