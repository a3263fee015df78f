//! JSON output of a pipeline run.
//!
//! The whole [`PipelineReport`] is serialized, articles and summaries with
//! their database ids, so a later process can reload it with [`load_report`].

use crate::error::Result;
use crate::models::PipelineReport;
use crate::utils::ensure_parent_dir;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `report` as pretty-printed JSON to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(report: &PipelineReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = ensure_parent_dir(path).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e);
    }

    fs::write(path, json).await?;
    info!(
        articles = report.articles.len(),
        summaries = report.summaries.len(),
        "Wrote JSON report"
    );
    Ok(())
}

/// Read a report written by [`write_report`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_report(path: &Path) -> Result<PipelineReport> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Summary};
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_then_load_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");

        let mut article = Article::from_api(Default::default(), Utc::now());
        article.id = Some(1);
        article.title = "Headline".into();
        let report = PipelineReport {
            articles: vec![article],
            summaries: vec![Summary::new(1, "Short.", "engine")],
        };

        write_report(&report, &path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"articles\""));

        let loaded = load_report(&path).await.unwrap();
        assert_eq!(loaded, report);
    }

    #[tokio::test]
    async fn test_load_missing_report_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_report(&dir.path().join("missing.json")).await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
