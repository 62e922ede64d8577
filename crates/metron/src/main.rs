use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use metron_models::{MetronConfig, PipelineInput};
use tracing_subscriber::EnvFilter;

/// Used when `--config` is not given and the file exists.
const DEFAULT_CONFIG_PATH: &str = "config/metron.toml";

#[derive(Parser, Debug)]
#[command(name = "metron", about = "Multi-model trading decision pipeline")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read PipelineInput JSON from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Override the per-stage timeout
    #[arg(long)]
    stage_timeout_ms: Option<u64>,

    /// Override the result cache TTL
    #[arg(long)]
    ttl_seconds: Option<u64>,

    /// Print the resolved role table and exit
    #[arg(long)]
    show_roles: bool,
}

fn resolve_config(cli: &Cli) -> Result<MetronConfig> {
    let mut config = match &cli.config {
        Some(path) => metron::load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            metron::load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => MetronConfig::default(),
    };

    if let Some(ms) = cli.stage_timeout_ms {
        config.pipeline.stage_timeout_ms = ms;
    }
    if let Some(secs) = cli.ttl_seconds {
        config.cache.ttl_seconds = secs;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up API keys from .env when present
    dotenvy::dotenv().ok();

    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    let pipeline = metron::build_pipeline(&config).context("Failed to build pipeline")?;

    if cli.show_roles {
        let table = pipeline.router().assignments();
        let output = if cli.pretty {
            serde_json::to_string_pretty(&table)?
        } else {
            serde_json::to_string(&table)?
        };
        println!("{output}");
        return Ok(());
    }

    // Read input
    let input_json = if let Some(input_path) = &cli.input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    let input: PipelineInput =
        serde_json::from_str(&input_json).context("Failed to parse PipelineInput JSON")?;

    let result = metron::evaluate(&pipeline, &input).await;

    // Output result as JSON to stdout
    let output = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");

    Ok(())
}
