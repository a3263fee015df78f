//! HTTP client with rate limiting, exponential backoff, and response validation.
//!
//! Every outbound call in the application goes through [`RetryingHttpClient`],
//! so the headline and completion integrations get identical resilience
//! without duplicating the retry loop.
//!
//! # Retry Strategy
//!
//! - `max_retries + 1` attempts in total (3 retries by default)
//! - Exponential backoff: `retry_delay * 2^attempt_index`, i.e. `d, 2d, 4d, ...`
//! - Optional random jitter on top of each delay (off by default)
//! - Network errors, non-2xx statuses, undecodable bodies, and validator
//!   rejections are all transient and retried the same way, unless the
//!   client is set to [`ValidationPolicy::FailFast`]
//!
//! # Rate Limiting
//!
//! Each client enforces a minimum spacing between its own dispatches
//! (1 second by default). The caller is made to wait; nothing is queued.
//! Two clients never slow each other down.

use crate::config::Config;
use crate::error::{AttemptFailure, Error, Result};
use rand::{Rng, rng};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Decides whether a decoded response body is semantically usable.
///
/// Returning `Err(reason)` marks the attempt as a validation failure.
pub trait ResponseValidator: Send + Sync {
    fn validate(&self, body: &Value) -> std::result::Result<(), String>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync,
{
    fn validate(&self, body: &Value) -> std::result::Result<(), String> {
        self(body)
    }
}

/// How validator rejections are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationPolicy {
    /// Rejections consume the retry budget like network failures.
    #[default]
    Retry,
    /// The first rejection ends the call with [`Error::ValidationRejected`].
    FailFast,
}

impl FromStr for ValidationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retry" => Ok(Self::Retry),
            "fail-fast" | "fail_fast" | "failfast" => Ok(Self::FailFast),
            other => Err(format!("unknown validation policy {other:?}")),
        }
    }
}

/// Optional parts of a request.
#[derive(Default)]
pub struct RequestOptions<'a> {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<&'a Value>,
    pub validator: Option<&'a dyn ResponseValidator>,
}

impl<'a> RequestOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn validator(mut self, validator: &'a dyn ResponseValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Result of a single attempt, consumed only by the retry loop.
enum AttemptOutcome {
    Success(Value),
    Retryable(AttemptFailure),
}

/// Minimum-spacing limiter: remembers when this client last dispatched.
struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous dispatch, then
    /// record now as the new dispatch time.
    ///
    /// The lock is held while sleeping so concurrent callers line up behind
    /// each other instead of all waking at the same instant.
    async fn wait_turn(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limiting: sleeping");
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// One client per upstream service; holds the base URL, credentials, retry
/// settings, and this instance's rate limiter state.
pub struct RetryingHttpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    max_jitter: Duration,
    validation_policy: ValidationPolicy,
    limiter: RateLimiter,
}

impl fmt::Debug for RetryingHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingHttpClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("min_interval", &self.limiter.min_interval)
            .field("validation_policy", &self.validation_policy)
            .finish()
    }
}

impl RetryingHttpClient {
    /// Create a client with the default policy: 30s timeout, 3 retries, 1s
    /// base delay, 1s minimum spacing.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_jitter: Duration::ZERO,
            validation_policy: ValidationPolicy::Retry,
            limiter: RateLimiter::new(Duration::from_secs(1)),
        }
    }

    /// Create a client whose retry settings come from `config`.
    pub fn from_config(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self::new(base_url, api_key)
            .with_timeout(config.request_timeout())
            .with_max_retries(config.max_retries)
            .with_retry_delay(config.retry_delay())
            .with_min_interval(config.min_interval())
            .with_validation_policy(config.validation_policy)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Add up to `max_jitter` of random delay on top of every backoff.
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.limiter = RateLimiter::new(min_interval);
        self
    }

    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validation_policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Perform one logical call. See the module docs for the retry policy.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for methods other than GET/POST, an
    ///   unparseable URL, or a malformed API key header. No request is sent.
    /// - [`Error::RequestExhausted`] once every attempt has failed.
    /// - [`Error::ValidationRejected`] under [`ValidationPolicy::FailFast`].
    #[instrument(level = "info", skip_all, fields(%method, endpoint = %endpoint))]
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        opts: RequestOptions<'_>,
    ) -> Result<Value> {
        if method != Method::GET && method != Method::POST {
            return Err(Error::InvalidRequest(format!(
                "unsupported HTTP method {method}"
            )));
        }
        let url = self.url_for(endpoint)?;
        let headers = self.headers_with_auth(&opts.headers)?;
        let total_attempts = self.max_retries.saturating_add(1);
        let total_t0 = Instant::now();
        let mut attempt_index = 0u32;

        loop {
            self.limiter.wait_turn().await;
            let attempt_t0 = Instant::now();
            let attempt = attempt_index + 1;

            let failure = match self.attempt(&method, &url, &headers, &opts).await {
                AttemptOutcome::Success(body) => {
                    if attempt > 1 {
                        info!(
                            attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(body);
                }
                AttemptOutcome::Retryable(failure) => failure,
            };

            if let AttemptFailure::Validation(reason) = &failure {
                if self.validation_policy == ValidationPolicy::FailFast {
                    warn!(attempt, %reason, "Response rejected; failing fast");
                    return Err(Error::ValidationRejected(reason.clone()));
                }
            }

            if attempt >= total_attempts {
                error!(
                    attempt,
                    max = total_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %failure,
                    "Request exhausted retries"
                );
                return Err(Error::RequestExhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = self.backoff_delay(attempt_index);
            warn!(
                attempt,
                max = total_attempts,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                ?delay,
                error = %failure,
                "Request attempt failed; backing off"
            );
            sleep(delay).await;
            attempt_index += 1;
        }
    }

    /// GET `endpoint` with the given options.
    pub async fn get(&self, endpoint: &str, opts: RequestOptions<'_>) -> Result<Value> {
        self.request(Method::GET, endpoint, opts).await
    }

    /// POST `body` as JSON to `endpoint`.
    pub async fn post(
        &self,
        endpoint: &str,
        body: &Value,
        opts: RequestOptions<'_>,
    ) -> Result<Value> {
        self.request(Method::POST, endpoint, opts.body(body)).await
    }

    /// Delay slept after the zero-based `attempt_index`-th failure.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt_index);
        let delay = self.retry_delay.saturating_mul(factor);
        if self.max_jitter.is_zero() {
            return delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay.saturating_add(Duration::from_millis(jitter_ms))
    }

    fn url_for(&self, endpoint: &str) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        let raw = if endpoint.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{endpoint}")
        };
        Url::parse(&raw).map_err(|e| Error::InvalidRequest(format!("bad URL {raw:?}: {e}")))
    }

    fn headers_with_auth(&self, supplied: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = supplied.clone();
        if !self.api_key.is_empty() && !headers.contains_key(AUTHORIZATION) {
            let value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::InvalidRequest(format!("API key is not a valid header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        opts: &RequestOptions<'_>,
    ) -> AttemptOutcome {
        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers.clone())
            .timeout(self.timeout);
        if !opts.query.is_empty() {
            req = req.query(&opts.query);
        }
        if let Some(body) = opts.body {
            req = req.json(body);
        }

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return AttemptOutcome::Retryable(AttemptFailure::Network(format!(
                    "timed out after {:?}",
                    self.timeout
                )));
            }
            Err(e) => return AttemptOutcome::Retryable(AttemptFailure::Network(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return AttemptOutcome::Retryable(AttemptFailure::Network(format!("HTTP {status}")));
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return AttemptOutcome::Retryable(AttemptFailure::Network(e.to_string())),
        };
        let body: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => return AttemptOutcome::Retryable(AttemptFailure::Decode(e.to_string())),
        };

        if let Some(validator) = opts.validator {
            if let Err(reason) = validator.validate(&body) {
                return AttemptOutcome::Retryable(AttemptFailure::Validation(reason));
            }
        }
        AttemptOutcome::Success(body)
    }
}
