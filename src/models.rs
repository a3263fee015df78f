//! Data models for headlines, stored articles, and their summaries.
//!
//! This module defines the core data structures used throughout the application:
//! - [`NewsApiArticle`]: one article exactly as the headline service returns it
//! - [`Article`]: an article as stored in the database, with matched themes
//! - [`Summary`]: the completion service's summary of one stored article
//! - [`PipelineReport`]: everything a single run produced
//!
//! The raw API types use `camelCase` field names to match the headline
//! service's JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `source` object attached to every headline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NewsApiSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A headline as returned by the headline service.
///
/// Every field is optional on the wire; missing ones deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsApiArticle {
    pub source: NewsApiSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

/// A news article, before or after it has been saved.
///
/// `id` is `None` until the article is first written to the database.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Article {
    pub id: Option<i64>,
    pub source_id: Option<String>,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub fetched_at: DateTime<Utc>,
    /// Themes this article matched during filtering.
    pub themes: Vec<String>,
}

impl Article {
    /// Convert a headline into an unsaved article fetched at `now`.
    ///
    /// A `publishedAt` that is present but not RFC 3339 is replaced by `now`.
    pub fn from_api(raw: NewsApiArticle, now: DateTime<Utc>) -> Self {
        let published_at = raw.published_at.as_deref().map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(now)
        });

        Self {
            id: None,
            source_id: raw.source.id,
            source_name: raw.source.name,
            author: raw.author,
            title: raw.title.unwrap_or_default(),
            description: raw.description,
            url: raw.url,
            url_to_image: raw.url_to_image,
            published_at,
            content: raw.content,
            fetched_at: now,
            themes: Vec::new(),
        }
    }

    /// Text to hand to the summarizer: content, else description, else empty.
    pub fn text_for_summary(&self) -> &str {
        self.content
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.description.as_deref())
            .unwrap_or("")
    }

    /// Themes as stored in the `themes` column.
    pub fn themes_column(&self) -> String {
        self.themes.join(",")
    }

    /// Inverse of [`Article::themes_column`].
    pub fn parse_themes_column(raw: Option<&str>) -> Vec<String> {
        raw.map(|s| {
            s.split(',')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
    }
}

/// A generated summary of one stored article.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    pub id: Option<i64>,
    pub article_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Engine that produced the text, or `none`/`error` for placeholders.
    pub model_used: String,
}

impl Summary {
    pub fn new(article_id: i64, content: impl Into<String>, model_used: impl Into<String>) -> Self {
        Self {
            id: None,
            article_id,
            content: content.into(),
            created_at: Utc::now(),
            model_used: model_used.into(),
        }
    }

    /// Render for the text report.
    ///
    /// ```text
    /// Title: <article title>
    /// Summary: <summary text>
    /// ```
    pub fn format_for_display(&self, article_title: Option<&str>) -> String {
        match article_title {
            Some(title) => crate::utils::format_summary(title, &self.content),
            None => format!("Summary: {}", self.content),
        }
    }
}

/// The articles and summaries produced by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PipelineReport {
    pub articles: Vec<Article>,
    pub summaries: Vec<Summary>,
}

impl PipelineReport {
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty() && self.summaries.is_empty()
    }
}
