//! The fetch → filter → persist → summarize → report pipeline.
//!
//! [`NewsFetcher::run`] drives one pass. Each stage logs and degrades instead of
//! failing the run: a failed headline fetch yields no articles, a failed
//! completion yields a placeholder summary, a failed insert skips that row.
//! A stage that produces nothing ends the run early with an empty
//! [`PipelineReport`].
//!
//! # Modes
//!
//! - [`RunMode::Sequential`]: summaries are requested one after another
//! - [`RunMode::Concurrent`]: summaries are fanned out through
//!   [`gather_settled`] with at most `concurrency` in flight
//!
//! [`NewsFetcher::run_background`] submits a whole run to a [`TaskRegistry`].

use crate::api::{CompletionClient, HeadlineQuery, NewsApiClient};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::models::{Article, PipelineReport, Summary};
use crate::outputs::{json, report};
use crate::tasks::{TaskId, TaskRegistry, gather_settled};
use crate::utils::{article_text, filter_articles_by_theme, truncate_for_log};
use chrono::Utc;
use itertools::Itertools;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub const NO_CONTENT_SUMMARY: &str = "No content available for summarization.";
pub const ERROR_SUMMARY: &str = "Error generating summary.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Sequential,
    Concurrent,
}

/// Per-run knobs, seeded from [`Config`] and overridden by the CLI.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub themes: Vec<String>,
    pub country: String,
    pub output_file: PathBuf,
    pub json_output: Option<PathBuf>,
    pub concurrency: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            themes: config.themes.clone(),
            country: config.country.clone(),
            output_file: PathBuf::from(&config.output_file),
            json_output: None,
            concurrency: config.concurrency,
        }
    }
}

#[derive(Debug)]
pub struct NewsFetcher {
    news: NewsApiClient,
    completions: CompletionClient,
    db: Database,
    settings: PipelineSettings,
}

impl NewsFetcher {
    pub fn new(
        news: NewsApiClient,
        completions: CompletionClient,
        db: Database,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            news,
            completions,
            db,
            settings,
        }
    }

    /// Build clients and open the database described by `config`.
    pub async fn from_config(config: &Config, settings: PipelineSettings) -> Result<Self> {
        let db = Database::new(&config.database_url).await?;
        Ok(Self::new(
            NewsApiClient::from_config(config),
            CompletionClient::from_config(config),
            db,
            settings,
        ))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Top headlines for the configured country. Empty on failure.
    #[instrument(level = "info", skip_all, fields(country = %self.settings.country))]
    pub async fn fetch_articles(&self) -> Vec<Article> {
        let query = HeadlineQuery::for_country(&self.settings.country);
        match self.news.top_headlines(&query).await {
            Ok(raw) => {
                let now = Utc::now();
                raw.into_iter().map(|a| Article::from_api(a, now)).collect()
            }
            Err(e) => {
                error!(error = %e, "Error fetching articles");
                Vec::new()
            }
        }
    }

    pub fn filter_articles(&self, articles: Vec<Article>) -> Vec<Article> {
        filter_articles_by_theme(articles, &self.settings.themes)
    }

    /// Persist articles, returning them with ids.
    ///
    /// Duplicate URLs within the batch are dropped. An article whose URL is
    /// already stored is not inserted again; the stored row gets the new themes.
    #[instrument(level = "info", skip_all, fields(count = articles.len()))]
    pub async fn save_articles_to_db(&self, articles: Vec<Article>) -> Vec<Article> {
        let unique: Vec<Article> = articles
            .into_iter()
            .unique_by(|a| a.url.clone().unwrap_or_else(|| format!("untitled:{}", a.title)))
            .collect();

        let mut saved = Vec::with_capacity(unique.len());
        for article in unique {
            match self.save_or_refresh(article).await {
                Ok(stored) => saved.push(stored),
                Err(e) => error!(error = %e, "Error saving article; skipping"),
            }
        }

        info!(saved = saved.len(), "Saved articles to the database");
        saved
    }

    async fn save_or_refresh(&self, article: Article) -> Result<Article> {
        let existing = match article.url.as_deref() {
            Some(url) => self.db.get_article_by_url(url).await?,
            None => None,
        };
        match existing {
            Some(mut stored) => {
                debug!(title = %stored.title, "Article already stored; updating themes");
                stored.themes = article.themes;
                self.db.save_article(&stored).await
            }
            None => self.db.save_article(&article).await,
        }
    }

    /// Summarize one article. Never fails: problems become placeholder summaries.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&article.title, 80)))]
    pub async fn summarize_article(&self, article: &Article) -> Summary {
        let outcome = self.request_summary(article).await;
        self.summary_from_outcome(article, outcome)
    }

    /// Summaries one after another, in article order.
    pub async fn summarize_articles(&self, articles: &[Article]) -> Vec<Summary> {
        let mut summaries = Vec::with_capacity(articles.len());
        for article in articles {
            summaries.push(self.summarize_article(article).await);
        }
        summaries
    }

    /// Summaries with at most `concurrency` requests in flight, in article order.
    #[instrument(level = "info", skip_all, fields(count = articles.len(), concurrency = self.settings.concurrency))]
    pub async fn summarize_articles_concurrent(&self, articles: &[Article]) -> Vec<Summary> {
        let outcomes = gather_settled(
            articles.iter().map(|a| self.request_summary(a)),
            self.settings.concurrency,
        )
        .await;

        articles
            .iter()
            .zip(outcomes)
            .map(|(article, outcome)| self.summary_from_outcome(article, outcome))
            .collect()
    }

    /// `Ok(None)` when the article has no usable text.
    async fn request_summary(&self, article: &Article) -> Result<Option<String>> {
        let text = article_text(article);
        if text.is_empty() {
            return Ok(None);
        }
        self.completions.summarize_article(&text).await.map(Some)
    }

    fn summary_from_outcome(&self, article: &Article, outcome: Result<Option<String>>) -> Summary {
        // Unsaved articles map to id 0, which the summaries table rejects.
        let article_id = article.id.unwrap_or_default();
        match outcome {
            Ok(Some(text)) => Summary::new(article_id, text, self.completions.engine_id()),
            Ok(None) => {
                warn!(title = %article.title, "No content to summarize");
                Summary::new(article_id, NO_CONTENT_SUMMARY, "none")
            }
            Err(e) => {
                error!(title = %article.title, error = %e, "Error summarizing article");
                Summary::new(article_id, ERROR_SUMMARY, "error")
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(count = summaries.len()))]
    pub async fn save_summaries_to_db(&self, summaries: Vec<Summary>) -> Vec<Summary> {
        let mut saved = Vec::with_capacity(summaries.len());
        for summary in summaries {
            match self.db.save_summary(&summary).await {
                Ok(stored) => saved.push(stored),
                Err(e) => error!(article_id = summary.article_id, error = %e, "Error saving summary; skipping"),
            }
        }
        info!(saved = saved.len(), "Saved summaries to the database");
        saved
    }

    /// Write the text report to the configured output file.
    pub async fn save_summaries_to_file(
        &self,
        summaries: &[Summary],
        articles: &[Article],
    ) -> Result<()> {
        let entries = report::format_report(summaries, articles);
        report::save_summaries_to_file(&entries, &self.settings.output_file).await
    }

    /// One full pass of the pipeline.
    #[instrument(level = "info", skip_all, fields(mode = ?mode))]
    pub async fn run(&self, mode: RunMode) -> PipelineReport {
        let started = Instant::now();

        let fetched = self.fetch_articles().await;
        if fetched.is_empty() {
            warn!("No articles fetched");
            return PipelineReport::default();
        }
        let fetched_count = fetched.len();

        let filtered = self.filter_articles(fetched);
        if filtered.is_empty() {
            warn!(themes = %self.settings.themes.join(", "), "No articles match the configured themes");
            return PipelineReport::default();
        }

        let articles = self.save_articles_to_db(filtered).await;
        if articles.is_empty() {
            warn!("No articles saved to the database");
            return PipelineReport::default();
        }

        let summaries = match mode {
            RunMode::Sequential => self.summarize_articles(&articles).await,
            RunMode::Concurrent => self.summarize_articles_concurrent(&articles).await,
        };
        let summaries = self.save_summaries_to_db(summaries).await;

        if let Err(e) = self.save_summaries_to_file(&summaries, &articles).await {
            error!(path = %self.settings.output_file.display(), error = %e, "Failed to write summary report");
        }

        let report = PipelineReport {
            articles,
            summaries,
        };

        if let Some(path) = &self.settings.json_output {
            if let Err(e) = json::write_report(&report, path).await {
                error!(path = %path.display(), error = %e, "Failed to write JSON report");
            }
        }

        info!(
            fetched = fetched_count,
            articles = report.articles.len(),
            summaries = report.summaries.len(),
            elapsed_ms_total = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );
        report
    }

    /// Submit [`NewsFetcher::run`] to `registry` and return the task id.
    pub fn run_background(
        self: &Arc<Self>,
        registry: &TaskRegistry<PipelineReport>,
        mode: RunMode,
    ) -> Result<TaskId> {
        let fetcher = Arc::clone(self);
        let id = registry.submit(async move { Ok::<_, Infallible>(fetcher.run(mode).await) })?;
        info!(task_id = id, "Pipeline submitted to background registry");
        Ok(id)
    }
}
