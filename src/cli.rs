//! Command-line interface definitions for the news fetcher.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Values given here override the YAML file and the environment.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news fetcher.
///
/// # Examples
///
/// ```sh
/// # One sequential run with the default themes
/// news_fetcher
///
/// # Summaries requested concurrently, custom themes
/// news_fetcher --async --themes climate,energy --output reports/today.txt
///
/// # Whole pipeline on the background worker pool, give up waiting after 5 minutes
/// news_fetcher --background --wait-timeout 300 --debug
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Request summaries concurrently
    #[arg(long = "async", conflicts_with = "background")]
    pub run_async: bool,

    /// Run the whole pipeline as a background task and wait for it
    #[arg(long)]
    pub background: bool,

    /// Comma-separated themes to filter headlines by
    #[arg(short, long, value_delimiter = ',')]
    pub themes: Option<Vec<String>>,

    /// Text report path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Country code for top headlines [default: us]
    #[arg(long)]
    pub country: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write the full report as JSON to this file
    #[arg(short, long)]
    pub json_output: Option<PathBuf>,

    /// Seconds to wait for a background run before giving up on it
    #[arg(long)]
    pub wait_timeout: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["news_fetcher"]);

        assert!(!cli.run_async);
        assert!(!cli.background);
        assert!(!cli.debug);
        assert_eq!(cli.themes, None);
        assert_eq!(cli.country, None);
        assert_eq!(cli.output, None);
        assert_eq!(cli.wait_timeout, None);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_fetcher",
            "--async",
            "--themes",
            "climate,energy",
            "--output",
            "out/today.txt",
            "--country",
            "gb",
            "--json-output",
            "out/today.json",
            "--log-file",
            "run.log",
            "--config",
            "config.yaml",
        ]);

        assert!(cli.run_async);
        assert_eq!(
            cli.themes,
            Some(vec!["climate".to_string(), "energy".to_string()])
        );
        assert_eq!(cli.output, Some(PathBuf::from("out/today.txt")));
        assert_eq!(cli.country.as_deref(), Some("gb"));
        assert_eq!(cli.json_output, Some(PathBuf::from("out/today.json")));
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
        assert_eq!(cli.config, Some(PathBuf::from("config.yaml")));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["news_fetcher", "-t", "health", "-o", "/tmp/s.txt", "-d"]);

        assert_eq!(cli.themes, Some(vec!["health".to_string()]));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/s.txt")));
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_background_with_timeout() {
        let cli = Cli::parse_from(["news_fetcher", "--background", "--wait-timeout", "2.5"]);
        assert!(cli.background);
        assert_eq!(cli.wait_timeout, Some(2.5));
    }

    #[test]
    fn test_cli_async_conflicts_with_background() {
        let result = Cli::try_parse_from(["news_fetcher", "--async", "--background"]);
        assert!(result.is_err());
    }
}
