//! ForumPulse command-line entry point
//!
//! 1. Loads configuration (files, environment, flags)
//! 2. Fetches, scores and stores posts for each community
//! 3. Writes the report and prints a console summary

use anyhow::Context;
use clap::Parser;
use forumpulse_common::config::{AppConfig, ObservabilityConfig};
use forumpulse_common::metrics::{install_prometheus, register_metrics, write_prometheus};
use forumpulse_common::VERSION;
use forumpulse_pipeline::cli::Cli;
use forumpulse_pipeline::{run_pipeline, PipelineError, RedditFetcher};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("forumpulse: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.observability);

    info!("Starting ForumPulse v{}", VERSION);

    let metrics = match &config.observability.metrics_file {
        Some(path) => {
            let handle = install_prometheus()?;
            register_metrics();
            Some((handle, path.clone()))
        }
        None => None,
    };

    let communities = cli.unique_communities();
    let fetcher = Arc::new(RedditFetcher::new(&config.fetch)?);

    let result = run_pipeline(&config, &communities, fetcher).await;

    if let Some((handle, path)) = &metrics {
        if let Err(e) = write_prometheus(handle, path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics file");
        }
    }

    match result {
        Ok(outcome) => {
            print!("{}", outcome.console_summary());
            Ok(())
        }
        Err(e @ PipelineError::TotalFailure { .. }) => {
            error!(error = %e, "Nothing was stored");
            Err(e.into())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Pipeline failed")),
    }
}

/// Logs go to stderr so stdout only carries the summary
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
