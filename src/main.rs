//! # News Fetcher
//!
//! Fetches top headlines, keeps the ones matching configured themes, stores
//! them in SQLite, asks a completion service for a short summary of each, and
//! writes a plain-text report.
//!
//! ## Usage
//!
//! ```sh
//! news_fetcher --themes technology,health --output news_summaries.txt
//! news_fetcher --async
//! news_fetcher --background --wait-timeout 600
//! ```
//!
//! ## Run modes
//!
//! 1. **Foreground** (default): summaries are requested one after another
//! 2. **Async** (`--async`): summaries are requested concurrently, bounded by
//!    `CONCURRENCY`
//! 3. **Background** (`--background`): the whole run is submitted to a task
//!    registry and `main` waits on it; Ctrl-C stops waiting

use clap::Parser;
use news_fetcher::config::Config;
use news_fetcher::models::PipelineReport;
use news_fetcher::pipeline::{NewsFetcher, PipelineSettings, RunMode};
use news_fetcher::tasks::{TaskRegistry, TaskStatus};
use news_fetcher::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    init_tracing(args.debug, args.log_file.as_deref())?;

    let start_time = std::time::Instant::now();
    info!("news_fetcher starting up");
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;
    apply_cli_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let mut settings = PipelineSettings::from_config(&config);
    settings.json_output = args.json_output.clone();
    let fetcher = Arc::new(NewsFetcher::from_config(&config, settings).await?);

    let report = if args.background {
        match run_in_background(&fetcher, &config, args.wait_timeout).await? {
            Some(report) => report,
            None => return Ok(()),
        }
    } else {
        let mode = if args.run_async {
            RunMode::Concurrent
        } else {
            RunMode::Sequential
        };
        fetcher.run(mode).await
    };

    let elapsed = start_time.elapsed();
    info!(
        articles = report.articles.len(),
        summaries = report.summaries.len(),
        output = %fetcher.settings().output_file.display(),
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Console logging, plus an ANSI-free copy to `log_file` when given.
///
/// `RUST_LOG` wins over `--debug` when set.
fn init_tracing(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339());

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let handle = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Arc::new(handle)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, args: &Cli) {
    if let Some(themes) = &args.themes {
        config.themes = themes
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if let Some(output) = &args.output {
        config.output_file = output.display().to_string();
    }
    if let Some(country) = &args.country {
        config.country = country.clone();
    }
}

/// Submit the run to a registry and wait for it.
///
/// Returns `None` when the wait is interrupted with Ctrl-C.
#[instrument(level = "info", skip_all, fields(workers = config.workers))]
async fn run_in_background(
    fetcher: &Arc<NewsFetcher>,
    config: &Config,
    wait_timeout: Option<f64>,
) -> Result<Option<PipelineReport>> {
    let timeout = wait_timeout
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| Error::config(format!("--wait-timeout {secs}: {e}")))
        })
        .transpose()?;

    let registry = TaskRegistry::new(config.workers);
    let task_id = fetcher.run_background(&registry, RunMode::Sequential)?;
    info!(task_id, ?timeout, "Waiting for background run");

    let snapshot = tokio::select! {
        waited = registry.wait(task_id, timeout) => waited,
        _ = tokio::signal::ctrl_c() => {
            warn!(task_id, "Interrupted; background run continues until the process exits");
            registry.shutdown(false).await;
            return Ok(None);
        }
    };

    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(task_id, error = %e, "Background run did not finish");
            registry.shutdown(false).await;
            return Err(e);
        }
    };
    registry.shutdown(true).await;

    match snapshot.status {
        TaskStatus::Completed => Ok(Some(snapshot.result.unwrap_or_default())),
        status => {
            let reason = snapshot.error.unwrap_or_else(|| status.to_string());
            error!(task_id, error = %reason, "Background run failed");
            Err(Error::TaskFailed { task_id, reason })
        }
    }
}
