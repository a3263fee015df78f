//! Database lifecycle and schema migrations.

use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::Database;

impl Database {
    /// Connect to `url` (`sqlite://path` or `sqlite::memory:`).
    ///
    /// Creates the database file and its parent directory if missing, then
    /// brings the schema up to date.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:");
        if !in_memory {
            let parent = options
                .get_filename()
                .parent()
                .filter(|p| !p.as_os_str().is_empty());
            if let Some(parent) = parent {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Every pooled connection to `:memory:` would open its own empty database.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        tracing::info!(url, "Database ready");
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_one(&mut *conn)
                .await?;

        if current_version.unwrap_or(0) < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: articles and summaries
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        sqlx::query("BEGIN").execute(&mut *conn).await?;

        let result = async {
            sqlx::query(
                r#"
                CREATE TABLE articles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source_id TEXT,
                    source_name TEXT,
                    author TEXT,
                    title TEXT NOT NULL,
                    description TEXT,
                    url TEXT,
                    url_to_image TEXT,
                    published_at TEXT,
                    content TEXT,
                    fetched_at TEXT NOT NULL,
                    themes TEXT NOT NULL DEFAULT ''
                )
                "#,
            )
            .execute(&mut *conn)
            .await?;

            sqlx::query("CREATE INDEX idx_articles_url ON articles(url)")
                .execute(&mut *conn)
                .await?;

            sqlx::query(
                r#"
                CREATE TABLE summaries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    model_used TEXT NOT NULL
                )
                "#,
            )
            .execute(&mut *conn)
            .await?;

            sqlx::query("CREATE INDEX idx_summaries_article ON summaries(article_id)")
                .execute(&mut *conn)
                .await?;

            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (1, ?)")
                .bind(chrono::Utc::now())
                .execute(&mut *conn)
                .await?;

            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    /// Close all pooled connections.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
