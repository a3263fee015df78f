//! Summary persistence and report listings.

use crate::Result;
use crate::models::Summary;

use super::{Database, SummaryListing, SummaryListingRow, SummaryRow};

impl Database {
    /// Insert the summary when it has no id, update it otherwise.
    pub async fn save_summary(&self, summary: &Summary) -> Result<Summary> {
        let mut saved = summary.clone();

        match summary.id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO summaries (article_id, content, created_at, model_used)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(summary.article_id)
                .bind(&summary.content)
                .bind(summary.created_at)
                .bind(&summary.model_used)
                .execute(&self.pool)
                .await?;
                saved.id = Some(result.last_insert_rowid());
            }
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE summaries
                    SET article_id = ?, content = ?, created_at = ?, model_used = ?
                    WHERE id = ?
                    "#,
                )
                .bind(summary.article_id)
                .bind(&summary.content)
                .bind(summary.created_at)
                .bind(&summary.model_used)
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(saved)
    }

    pub async fn get_summary(&self, id: i64) -> Result<Option<Summary>> {
        let row = sqlx::query_as::<_, SummaryRow>(
            "SELECT id, article_id, content, created_at, model_used FROM summaries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Summary::from))
    }

    pub async fn list_summaries(&self, limit: i64, offset: i64) -> Result<Vec<Summary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, article_id, content, created_at, model_used
            FROM summaries
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Summary::from).collect())
    }

    pub async fn delete_summary(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM summaries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Every summary of one article, newest first.
    pub async fn summaries_for_article(&self, article_id: i64) -> Result<Vec<Summary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, article_id, content, created_at, model_used
            FROM summaries
            WHERE article_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Summary::from).collect())
    }

    /// Most recent summaries joined with their article's title and URL.
    pub async fn latest_summaries(&self, limit: i64) -> Result<Vec<SummaryListing>> {
        let rows = sqlx::query_as::<_, SummaryListingRow>(
            r#"
            SELECT s.id, s.article_id, s.content, s.created_at, s.model_used, a.title, a.url
            FROM summaries s
            JOIN articles a ON a.id = s.article_id
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SummaryListing::from).collect())
    }
}
