use super::{sample_article, temp_db};

#[tokio::test]
async fn test_save_and_get_article() {
    let (db, _dir) = temp_db().await;
    let article = sample_article("Chip news", "https://e.com/chip", &["technology"]);

    let saved = db.save_article(&article).await.unwrap();
    let id = saved.id.expect("id assigned on insert");
    assert!(id > 0);

    let loaded = db.get_article(id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Chip news");
    assert_eq!(loaded.url.as_deref(), Some("https://e.com/chip"));
    assert_eq!(loaded.themes, vec!["technology"]);
    assert_eq!(loaded.published_at, article.published_at);
    assert_eq!(loaded.fetched_at, article.fetched_at);
    assert_eq!(loaded.source_name.as_deref(), Some("Source"));
}

#[tokio::test]
async fn test_save_existing_article_updates_in_place() {
    let (db, _dir) = temp_db().await;
    let mut saved = db
        .save_article(&sample_article("Old", "https://e.com/a", &["health"]))
        .await
        .unwrap();

    saved.title = "New".to_string();
    saved.themes.push("finance".to_string());
    let updated = db.save_article(&saved).await.unwrap();
    assert_eq!(updated.id, saved.id);

    let loaded = db.get_article(saved.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.title, "New");
    assert_eq!(loaded.themes, vec!["health", "finance"]);
    assert_eq!(db.list_articles(10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_missing_article_is_none() {
    let (db, _dir) = temp_db().await;
    assert!(db.get_article(999).await.unwrap().is_none());
    assert!(db.get_article_by_url("https://nowhere").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_article_by_url() {
    let (db, _dir) = temp_db().await;
    db.save_article(&sample_article("A", "https://e.com/a", &[]))
        .await
        .unwrap();
    let b = db
        .save_article(&sample_article("B", "https://e.com/b", &[]))
        .await
        .unwrap();

    let found = db.get_article_by_url("https://e.com/b").await.unwrap().unwrap();
    assert_eq!(found.id, b.id);
}

#[tokio::test]
async fn test_list_articles_paginates() {
    let (db, _dir) = temp_db().await;
    for i in 0..5 {
        db.save_article(&sample_article(&format!("T{i}"), &format!("https://e.com/{i}"), &[]))
            .await
            .unwrap();
    }

    let first = db.list_articles(2, 0).await.unwrap();
    let rest = db.list_articles(10, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(rest.len(), 3);
    assert!(first.iter().all(|a| rest.iter().all(|b| a.id != b.id)));
}

#[tokio::test]
async fn test_delete_article_cascades_to_summaries() {
    let (db, _dir) = temp_db().await;
    let article = db
        .save_article(&sample_article("Gone", "https://e.com/gone", &[]))
        .await
        .unwrap();
    let id = article.id.unwrap();
    let summary = db
        .save_summary(&crate::models::Summary::new(id, "text", "engine"))
        .await
        .unwrap();

    assert!(db.delete_article(id).await.unwrap());
    assert!(!db.delete_article(id).await.unwrap());
    assert!(db.get_summary(summary.id.unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_articles_by_themes() {
    let (db, _dir) = temp_db().await;
    db.save_article(&sample_article("Tech", "https://e.com/t", &["technology"]))
        .await
        .unwrap();
    db.save_article(&sample_article("Money", "https://e.com/m", &["finance"]))
        .await
        .unwrap();
    db.save_article(&sample_article("Both", "https://e.com/b", &["health", "finance"]))
        .await
        .unwrap();

    let finance = db
        .articles_by_themes(&["finance".to_string()], 10, 0)
        .await
        .unwrap();
    let mut titles: Vec<_> = finance.iter().map(|a| a.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["Both", "Money"]);

    let any = db
        .articles_by_themes(&["technology".to_string(), "health".to_string()], 10, 0)
        .await
        .unwrap();
    assert_eq!(any.len(), 2);

    assert!(db.articles_by_themes(&[], 10, 0).await.unwrap().is_empty());
    assert_eq!(
        db.articles_by_themes(&["finance".to_string()], 1, 0)
            .await
            .unwrap()
            .len(),
        1
    );
}
