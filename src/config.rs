//! Runtime configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. An optional YAML file (`--config path/to/config.yaml`)
//! 3. `.env` and the process environment (`NEWS_API_KEY`, `MAX_RETRIES`, ...)
//! 4. Command-line overrides, applied by `main`
//!
//! ```yaml
//! news_api_key: "..."
//! completion_api_key: "..."
//! themes: [technology, climate]
//! max_retries: 5
//! retry_delay_secs: 2
//! ```

use crate::api::ValidationPolicy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

/// All settings the fetcher needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Key for the headline service.
    pub news_api_key: String,
    /// Base URL of the headline service.
    pub news_api_url: String,
    /// Key for the completion service.
    pub completion_api_key: String,
    /// Engine (model) used for completions.
    pub engine_id: String,
    /// Base URL of the completion service.
    pub completion_api_url: String,
    /// Keyword themes used to filter headlines.
    pub themes: Vec<String>,
    /// Where the text report is written.
    pub output_file: String,
    /// SQLite connection URL.
    pub database_url: String,
    /// Per-attempt HTTP timeout, in seconds.
    pub request_timeout_secs: f64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff delay, in seconds. Doubles every retry.
    pub retry_delay_secs: f64,
    /// Minimum spacing between two requests of one client, in seconds.
    pub min_interval_secs: f64,
    /// Completion length limit.
    pub max_tokens: u32,
    /// Completion sampling temperature.
    pub temperature: f32,
    /// Background worker pool size.
    pub workers: usize,
    /// Concurrency ceiling for fan-out of summary requests.
    pub concurrency: usize,
    /// Country code for top headlines.
    pub country: String,
    /// What to do when a response fails validation.
    pub validation_policy: ValidationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            news_api_key: String::new(),
            news_api_url: "https://newsapi.org/v2".to_string(),
            completion_api_key: String::new(),
            engine_id: "YOUR_ENGINE_ID".to_string(),
            completion_api_url: "https://api.openrouter.ai/v1".to_string(),
            themes: vec![
                "technology".to_string(),
                "health".to_string(),
                "finance".to_string(),
            ],
            output_file: "news_summaries.txt".to_string(),
            database_url: "sqlite://news_fetcher.db".to_string(),
            request_timeout_secs: 30.0,
            max_retries: 3,
            retry_delay_secs: 1.0,
            min_interval_secs: 1.0,
            max_tokens: 150,
            temperature: 0.5,
            workers: 5,
            concurrency: 5,
            country: "us".to_string(),
            validation_policy: ValidationPolicy::Retry,
        }
    }
}

impl Config {
    /// Build the configuration from defaults, an optional YAML file, `.env`
    /// and the process environment.
    #[instrument(level = "info", skip_all, fields(config_file = ?path))]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p).await?,
            None => Self::default(),
        };

        match dotenvy::dotenv() {
            Ok(env_path) => debug!(path = %env_path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(Error::config(format!("invalid .env file: {e}"))),
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        info!(
            themes = ?config.themes,
            max_retries = config.max_retries,
            workers = config.workers,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse a YAML config file. Missing keys keep their defaults.
    pub async fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&raw)
    }

    /// Parse YAML text. Missing keys keep their defaults.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overlay values from an environment lookup.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NEWS_API_KEY") {
            self.news_api_key = v;
        }
        if let Some(v) = lookup("NEWS_API_URL") {
            self.news_api_url = v;
        }
        if let Some(v) = lookup("OPENROUTER_API_KEY") {
            self.completion_api_key = v;
        }
        if let Some(v) = lookup("OPENROUTER_ENGINE_ID") {
            self.engine_id = v;
        }
        if let Some(v) = lookup("OPENROUTER_URL") {
            self.completion_api_url = v;
        }
        if let Some(v) = lookup("THEMES") {
            self.themes = parse_list(&v);
        }
        if let Some(v) = lookup("OUTPUT_FILE") {
            self.output_file = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("COUNTRY") {
            self.country = v;
        }
        parse_into(&lookup, "REQUEST_TIMEOUT", &mut self.request_timeout_secs)?;
        parse_into(&lookup, "MAX_RETRIES", &mut self.max_retries)?;
        parse_into(&lookup, "RETRY_DELAY", &mut self.retry_delay_secs)?;
        parse_into(&lookup, "MIN_REQUEST_INTERVAL", &mut self.min_interval_secs)?;
        parse_into(&lookup, "MAX_TOKENS", &mut self.max_tokens)?;
        parse_into(&lookup, "TEMPERATURE", &mut self.temperature)?;
        parse_into(&lookup, "WORKERS", &mut self.workers)?;
        parse_into(&lookup, "CONCURRENCY", &mut self.concurrency)?;
        parse_into(&lookup, "VALIDATION_POLICY", &mut self.validation_policy)?;
        Ok(())
    }

    /// Check that both API keys are present and numeric settings make sense.
    pub fn validate(&self) -> Result<()> {
        if self.news_api_key.is_empty() {
            return Err(Error::config("NEWS_API_KEY is not set"));
        }
        if self.completion_api_key.is_empty() {
            return Err(Error::config("OPENROUTER_API_KEY is not set"));
        }
        if self.workers == 0 {
            return Err(Error::config("workers must be at least 1"));
        }
        for (name, value) in [("workers", self.workers), ("concurrency", self.concurrency)] {
            if value > Semaphore::MAX_PERMITS {
                return Err(Error::config(format!(
                    "{name} must be at most {}",
                    Semaphore::MAX_PERMITS
                )));
            }
        }
        for (name, secs) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("retry_delay_secs", self.retry_delay_secs),
            ("min_interval_secs", self.min_interval_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(Error::config(format!("{name} must be a non-negative number")));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        secs(self.retry_delay_secs)
    }

    pub fn min_interval(&self) -> Duration {
        secs(self.min_interval_secs)
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_into<T, F>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| Error::config(format!("{key}={raw:?}: {e}")))?;
    }
    Ok(())
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.min_interval(), Duration::from_secs(1));
        assert_eq!(config.workers, 5);
        assert_eq!(config.themes, vec!["technology", "health", "finance"]);
        assert_eq!(config.validation_policy, ValidationPolicy::Retry);
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("NEWS_API_KEY", "news-key"),
                ("THEMES", "climate, space ,,ai"),
                ("MAX_RETRIES", "5"),
                ("RETRY_DELAY", "0.25"),
                ("VALIDATION_POLICY", "fail-fast"),
            ]))
            .unwrap();

        assert_eq!(config.news_api_key, "news-key");
        assert_eq!(config.themes, vec!["climate", "space", "ai"]);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.validation_policy, ValidationPolicy::FailFast);
    }

    #[test]
    fn test_apply_env_rejects_garbage_numbers() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("MAX_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("MAX_RETRIES")));
    }

    #[test]
    fn test_yaml_partial_keeps_defaults() {
        let config = Config::from_yaml_str(
            "news_api_key: abc\nthemes: [sports]\nmax_tokens: 300\n",
        )
        .unwrap();
        assert_eq!(config.news_api_key, "abc");
        assert_eq!(config.themes, vec!["sports"]);
        assert_eq!(config.max_tokens, 300);
        assert_eq!(config.output_file, "news_summaries.txt");
    }

    #[test]
    fn test_validate_requires_keys() {
        let mut config = Config::default();
        assert!(config.validate().is_err());
        config.news_api_key = "a".into();
        assert!(config.validate().is_err());
        config.completion_api_key = "b".into();
        assert!(config.validate().is_ok());
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_pools() {
        let mut config = Config::default();
        config.news_api_key = "a".into();
        config.completion_api_key = "b".into();
        config
            .apply_env(env(&[("CONCURRENCY", "3000000000000000000")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("concurrency")));

        config.concurrency = 5;
        config.workers = usize::MAX;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("workers")));

        config.workers = Semaphore::MAX_PERMITS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a,b , c"), vec!["a", "b", "c"]);
        assert!(parse_list(" , ").is_empty());
    }
}
