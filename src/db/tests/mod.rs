mod articles;
mod summaries;

use crate::db::Database;
use crate::models::{Article, NewsApiArticle, NewsApiSource};
use chrono::Utc;
use tempfile::TempDir;

/// Fresh file-backed database inside a temp dir that lives as long as the handle.
pub(super) async fn temp_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("news.db").display());
    let db = Database::new(&url).await.unwrap();
    (db, dir)
}

pub(super) fn sample_article(title: &str, url: &str, themes: &[&str]) -> Article {
    let raw = NewsApiArticle {
        source: NewsApiSource {
            id: Some("src".into()),
            name: Some("Source".into()),
        },
        author: Some("Reporter".into()),
        title: Some(title.into()),
        description: Some(format!("{title} description")),
        url: Some(url.into()),
        url_to_image: None,
        published_at: Some("2024-05-01T08:00:00Z".into()),
        content: Some(format!("{title} content")),
    };
    let mut article = Article::from_api(raw, Utc::now());
    article.themes = themes.iter().map(|t| t.to_string()).collect();
    article
}

#[tokio::test]
async fn test_new_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/news.db");
    let db = Database::new(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    assert!(path.exists());
    db.close().await;
}

#[tokio::test]
async fn test_reopen_keeps_data_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("news.db").display());

    let db = Database::new(&url).await.unwrap();
    let saved = db
        .save_article(&sample_article("Kept", "https://e.com/kept", &[]))
        .await
        .unwrap();
    db.close().await;

    let db = Database::new(&url).await.unwrap();
    let loaded = db.get_article(saved.id.unwrap()).await.unwrap();
    assert_eq!(loaded.unwrap().title, "Kept");
}

#[tokio::test]
async fn test_in_memory_database_is_usable() {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let saved = db
        .save_article(&sample_article("Mem", "https://e.com/mem", &[]))
        .await
        .unwrap();
    assert!(db.get_article(saved.id.unwrap()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_query_after_close_returns_error() {
    let (db, _dir) = temp_db().await;
    db.pool().close().await;
    assert!(db.get_article(1).await.is_err());
}
