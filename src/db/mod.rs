//! SQLite persistence for articles and summaries.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by table:
//! - [`migrations`]: connection lifecycle and schema creation
//! - [`articles`]: article CRUD and theme lookup
//! - [`summaries`]: summary CRUD and report listings

use crate::models::{Article, Summary};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod articles;
mod migrations;
mod summaries;

/// Article record as stored in the `articles` table.
#[derive(Debug, Clone, FromRow)]
struct ArticleRow {
    id: i64,
    source_id: Option<String>,
    source_name: Option<String>,
    author: Option<String>,
    title: String,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<DateTime<Utc>>,
    content: Option<String>,
    fetched_at: DateTime<Utc>,
    /// Comma-joined theme names
    themes: String,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: Some(row.id),
            source_id: row.source_id,
            source_name: row.source_name,
            author: row.author,
            title: row.title,
            description: row.description,
            url: row.url,
            url_to_image: row.url_to_image,
            published_at: row.published_at,
            content: row.content,
            fetched_at: row.fetched_at,
            themes: Article::parse_themes_column(Some(&row.themes)),
        }
    }
}

/// Summary record as stored in the `summaries` table.
#[derive(Debug, Clone, FromRow)]
struct SummaryRow {
    id: i64,
    article_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    model_used: String,
}

impl From<SummaryRow> for Summary {
    fn from(row: SummaryRow) -> Self {
        Summary {
            id: Some(row.id),
            article_id: row.article_id,
            content: row.content,
            created_at: row.created_at,
            model_used: row.model_used,
        }
    }
}

/// A summary together with the title and URL of its article.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryListing {
    pub summary: Summary,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct SummaryListingRow {
    id: i64,
    article_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    model_used: String,
    title: String,
    url: Option<String>,
}

impl From<SummaryListingRow> for SummaryListing {
    fn from(row: SummaryListingRow) -> Self {
        SummaryListing {
            summary: Summary {
                id: Some(row.id),
                article_id: row.article_id,
                content: row.content,
                created_at: row.created_at,
                model_used: row.model_used,
            },
            title: row.title,
            url: row.url,
        }
    }
}

/// Handle to the article/summary store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
