//! Article persistence.

use crate::Result;
use crate::models::Article;

use super::{ArticleRow, Database};

const ARTICLE_COLUMNS: &str = "id, source_id, source_name, author, title, description, url, \
     url_to_image, published_at, content, fetched_at, themes";

impl Database {
    /// Insert the article when it has no id, update it otherwise.
    ///
    /// Returns the article with its id set.
    pub async fn save_article(&self, article: &Article) -> Result<Article> {
        let mut saved = article.clone();

        match article.id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO articles (
                        source_id, source_name, author, title, description, url,
                        url_to_image, published_at, content, fetched_at, themes
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&article.source_id)
                .bind(&article.source_name)
                .bind(&article.author)
                .bind(&article.title)
                .bind(&article.description)
                .bind(&article.url)
                .bind(&article.url_to_image)
                .bind(article.published_at)
                .bind(&article.content)
                .bind(article.fetched_at)
                .bind(article.themes_column())
                .execute(&self.pool)
                .await?;
                saved.id = Some(result.last_insert_rowid());
            }
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE articles SET
                        source_id = ?, source_name = ?, author = ?, title = ?,
                        description = ?, url = ?, url_to_image = ?, published_at = ?,
                        content = ?, fetched_at = ?, themes = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&article.source_id)
                .bind(&article.source_name)
                .bind(&article.author)
                .bind(&article.title)
                .bind(&article.description)
                .bind(&article.url)
                .bind(&article.url_to_image)
                .bind(article.published_at)
                .bind(&article.content)
                .bind(article.fetched_at)
                .bind(article.themes_column())
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(saved)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Article::from))
    }

    /// Oldest stored article with this URL.
    pub async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = ? ORDER BY id LIMIT 1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Article::from))
    }

    /// Articles newest-fetched first.
    pub async fn list_articles(&self, limit: i64, offset: i64) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY fetched_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Delete an article and its summaries. Returns whether a row was removed.
    pub async fn delete_article(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Articles whose stored themes mention any of `themes`, newest first.
    pub async fn articles_by_themes(
        &self,
        themes: &[String],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Article>> {
        if themes.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = sqlx::QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE "
        ));
        let mut separated = builder.separated(" OR ");
        for theme in themes {
            separated.push("themes LIKE ");
            separated.push_bind_unseparated(format!("%{theme}%"));
        }
        builder.push(" ORDER BY fetched_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }
}
