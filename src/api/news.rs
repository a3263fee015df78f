//! Headline service client.
//!
//! Wraps [`RetryingHttpClient`] with the two headline endpoints and the
//! response check they share: `status == "ok"` and an `articles` array.

use super::client::{RequestOptions, RetryingHttpClient};
use crate::config::Config;
use crate::error::Result;
use crate::models::NewsApiArticle;
use serde_json::Value;
use tracing::{info, instrument};

/// Parameters for `top-headlines`.
#[derive(Debug, Clone)]
pub struct HeadlineQuery {
    pub country: String,
    pub category: Option<String>,
    pub q: Option<String>,
    pub page_size: u32,
    pub page: u32,
}

impl Default for HeadlineQuery {
    fn default() -> Self {
        Self {
            country: "us".to_string(),
            category: None,
            q: None,
            page_size: 20,
            page: 1,
        }
    }
}

impl HeadlineQuery {
    pub fn for_country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }
}

/// Parameters for `everything`.
#[derive(Debug, Clone)]
pub struct EverythingQuery {
    pub q: Option<String>,
    pub sources: Option<String>,
    pub domains: Option<String>,
    /// ISO 8601 date, e.g. `2024-12-25`.
    pub from: Option<String>,
    pub to: Option<String>,
    pub language: String,
    /// `relevancy`, `popularity` or `publishedAt`.
    pub sort_by: String,
    pub page_size: u32,
    pub page: u32,
}

impl Default for EverythingQuery {
    fn default() -> Self {
        Self {
            q: None,
            sources: None,
            domains: None,
            from: None,
            to: None,
            language: "en".to_string(),
            sort_by: "publishedAt".to_string(),
            page_size: 20,
            page: 1,
        }
    }
}

/// Check a headline response before it is accepted.
pub fn validate_news_response(body: &Value) -> std::result::Result<(), String> {
    match body.get("status").and_then(Value::as_str) {
        None => return Err("response missing 'status' field".to_string()),
        Some("ok") => {}
        Some(other) => return Err(format!("API returned error status: {other}")),
    }
    if body.get("articles").is_none() {
        return Err("response missing 'articles' field".to_string());
    }
    Ok(())
}

#[derive(Debug)]
pub struct NewsApiClient {
    http: RetryingHttpClient,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(http: RetryingHttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let http =
            RetryingHttpClient::from_config(&config.news_api_url, &config.news_api_key, config);
        Self::new(http, config.news_api_key.clone())
    }

    /// Fetch top headlines.
    #[instrument(level = "info", skip_all, fields(country = %query.country, page = query.page))]
    pub async fn top_headlines(&self, query: &HeadlineQuery) -> Result<Vec<NewsApiArticle>> {
        let mut opts = RequestOptions::new()
            .query("country", &query.country)
            .query("pageSize", query.page_size)
            .query("page", query.page)
            .query("apiKey", &self.api_key);
        if let Some(category) = &query.category {
            opts = opts.query("category", category);
        }
        if let Some(q) = &query.q {
            opts = opts.query("q", q);
        }

        let body = self
            .http
            .get("top-headlines", opts.validator(&validate_news_response))
            .await?;
        let articles = parse_articles(body)?;
        info!(count = articles.len(), "Fetched top headlines");
        Ok(articles)
    }

    /// Search all articles.
    #[instrument(level = "info", skip_all, fields(q = ?query.q, page = query.page))]
    pub async fn everything(&self, query: &EverythingQuery) -> Result<Vec<NewsApiArticle>> {
        let mut opts = RequestOptions::new()
            .query("language", &query.language)
            .query("sortBy", &query.sort_by)
            .query("pageSize", query.page_size)
            .query("page", query.page)
            .query("apiKey", &self.api_key);
        for (key, value) in [
            ("q", &query.q),
            ("sources", &query.sources),
            ("domains", &query.domains),
            ("from", &query.from),
            ("to", &query.to),
        ] {
            if let Some(v) = value {
                opts = opts.query(key, v);
            }
        }

        let body = self
            .http
            .get("everything", opts.validator(&validate_news_response))
            .await?;
        let articles = parse_articles(body)?;
        info!(count = articles.len(), "Fetched search results");
        Ok(articles)
    }
}

fn parse_articles(mut body: Value) -> Result<Vec<NewsApiArticle>> {
    let articles = body
        .get_mut("articles")
        .map(Value::take)
        .unwrap_or(Value::Array(Vec::new()));
    Ok(serde_json::from_value(articles)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> NewsApiClient {
        let http = RetryingHttpClient::new(server.uri(), "key-1")
            .with_retry_delay(Duration::from_millis(5))
            .with_min_interval(Duration::ZERO);
        NewsApiClient::new(http, "key-1")
    }

    #[test]
    fn test_validate_news_response() {
        assert!(validate_news_response(&json!({"status": "ok", "articles": []})).is_ok());
        assert!(validate_news_response(&json!({"articles": []})).is_err());
        assert!(validate_news_response(&json!({"status": "error", "articles": []})).is_err());
        assert!(validate_news_response(&json!({"status": "ok"})).is_err());
    }

    #[tokio::test]
    async fn test_top_headlines_sends_query_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .and(query_param("country", "gb"))
            .and(query_param("pageSize", "20"))
            .and(query_param("apiKey", "key-1"))
            .and(query_param("category", "technology"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 1,
                "articles": [{
                    "source": {"id": null, "name": "BBC"},
                    "title": "Chips",
                    "url": "https://bbc.example/chips"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut query = HeadlineQuery::for_country("gb");
        query.category = Some("technology".into());
        let articles = client(&server).top_headlines(&query).await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title.as_deref(), Some("Chips"));
        assert_eq!(articles[0].source.name.as_deref(), Some("BBC"));
    }

    #[tokio::test]
    async fn test_error_status_is_retried_then_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "error", "code": "rateLimited"})),
            )
            .expect(4)
            .mount(&server)
            .await;

        let err = client(&server)
            .everything(&EverythingQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::RequestExhausted { attempts: 4, .. }));
    }
}
