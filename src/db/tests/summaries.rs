use super::{sample_article, temp_db};
use crate::models::Summary;
use chrono::{Duration, Utc};

#[tokio::test]
async fn test_save_and_get_summary() {
    let (db, _dir) = temp_db().await;
    let article = db
        .save_article(&sample_article("A", "https://e.com/a", &[]))
        .await
        .unwrap();

    let summary = Summary::new(article.id.unwrap(), "Short.", "engine-1");
    let saved = db.save_summary(&summary).await.unwrap();
    let loaded = db.get_summary(saved.id.unwrap()).await.unwrap().unwrap();

    assert_eq!(loaded.content, "Short.");
    assert_eq!(loaded.model_used, "engine-1");
    assert_eq!(loaded.article_id, article.id.unwrap());
    assert_eq!(loaded.created_at, summary.created_at);
}

#[tokio::test]
async fn test_update_and_delete_summary() {
    let (db, _dir) = temp_db().await;
    let article = db
        .save_article(&sample_article("A", "https://e.com/a", &[]))
        .await
        .unwrap();
    let mut saved = db
        .save_summary(&Summary::new(article.id.unwrap(), "v1", "e"))
        .await
        .unwrap();

    saved.content = "v2".to_string();
    db.save_summary(&saved).await.unwrap();
    let id = saved.id.unwrap();
    assert_eq!(db.get_summary(id).await.unwrap().unwrap().content, "v2");

    assert!(db.delete_summary(id).await.unwrap());
    assert!(db.get_summary(id).await.unwrap().is_none());
    assert!(!db.delete_summary(id).await.unwrap());
}

#[tokio::test]
async fn test_summary_requires_existing_article() {
    let (db, _dir) = temp_db().await;
    let result = db.save_summary(&Summary::new(12345, "orphan", "e")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_summaries_for_article_newest_first() {
    let (db, _dir) = temp_db().await;
    let a = db
        .save_article(&sample_article("A", "https://e.com/a", &[]))
        .await
        .unwrap();
    let b = db
        .save_article(&sample_article("B", "https://e.com/b", &[]))
        .await
        .unwrap();
    let a_id = a.id.unwrap();

    let mut older = Summary::new(a_id, "older", "e");
    older.created_at = Utc::now() - Duration::minutes(5);
    db.save_summary(&older).await.unwrap();
    db.save_summary(&Summary::new(a_id, "newer", "e")).await.unwrap();
    db.save_summary(&Summary::new(b.id.unwrap(), "other", "e"))
        .await
        .unwrap();

    let found = db.summaries_for_article(a_id).await.unwrap();
    let contents: Vec<_> = found.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(contents, vec!["newer", "older"]);
}

#[tokio::test]
async fn test_list_and_latest_summaries() {
    let (db, _dir) = temp_db().await;
    let article = db
        .save_article(&sample_article("Headline", "https://e.com/h", &[]))
        .await
        .unwrap();
    let id = article.id.unwrap();
    for i in 0..3 {
        let mut s = Summary::new(id, format!("s{i}"), "e");
        s.created_at = Utc::now() - Duration::minutes(10 - i);
        db.save_summary(&s).await.unwrap();
    }

    assert_eq!(db.list_summaries(10, 0).await.unwrap().len(), 3);
    assert_eq!(db.list_summaries(10, 2).await.unwrap().len(), 1);

    let latest = db.latest_summaries(2).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].summary.content, "s2");
    assert_eq!(latest[0].title, "Headline");
    assert_eq!(latest[0].url.as_deref(), Some("https://e.com/h"));
}
