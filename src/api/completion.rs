//! Completion service client used to summarize articles.

use super::client::{RequestOptions, RetryingHttpClient};
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Body of a completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Check that `choices` is non-empty and its first entry carries `text`.
pub fn validate_completion_response(body: &Value) -> std::result::Result<(), String> {
    let choices = body
        .get("choices")
        .ok_or_else(|| "response missing 'choices' field".to_string())?;
    let first = choices
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| "response contains empty 'choices' array".to_string())?;
    if first.get("text").and_then(Value::as_str).is_none() {
        return Err("response missing 'text' field in first choice".to_string());
    }
    Ok(())
}

#[derive(Debug)]
pub struct CompletionClient {
    http: RetryingHttpClient,
    engine_id: String,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(
        http: RetryingHttpClient,
        engine_id: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            http,
            engine_id: engine_id.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let http = RetryingHttpClient::from_config(
            &config.completion_api_url,
            &config.completion_api_key,
            config,
        );
        Self::new(http, &config.engine_id, config.max_tokens, config.temperature)
    }

    /// Engine recorded as `model_used` on generated summaries.
    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    /// A request for `prompt` using this client's token and temperature settings.
    pub fn request_for(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.into(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: None,
        }
    }

    /// Generate a completion and return its trimmed text.
    #[instrument(level = "info", skip_all, fields(engine = %self.engine_id, prompt_len = request.prompt.len()))]
    pub async fn generate_completion(&self, request: &CompletionRequest) -> Result<String> {
        let endpoint = format!("engines/{}/completions", self.engine_id);
        let body = serde_json::to_value(request)?;
        let opts = RequestOptions::new()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .validator(&validate_completion_response);

        let response = self.http.post(&endpoint, &body, opts).await?;
        let text = response["choices"][0]["text"]
            .as_str()
            .ok_or_else(|| Error::InvalidRequest("completion text vanished after validation".into()))?
            .trim()
            .to_string();
        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }

    /// Summarize an article's text.
    pub async fn summarize_article(&self, article_text: &str) -> Result<String> {
        let prompt = format!("Summarize the following article:\n\n{article_text}");
        self.generate_completion(&self.request_for(prompt)).await
    }
}
