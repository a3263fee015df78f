//! Plain-text summary report.

use crate::error::Result;
use crate::models::{Article, Summary};
use crate::utils::ensure_parent_dir;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Pair every summary with its article's title.
///
/// Summaries whose article is not in `articles` are shown as "Unknown Title".
pub fn format_report(summaries: &[Summary], articles: &[Article]) -> Vec<String> {
    let titles: HashMap<i64, &str> = articles
        .iter()
        .filter_map(|a| a.id.map(|id| (id, a.title.as_str())))
        .collect();

    summaries
        .iter()
        .map(|s| {
            let title = titles.get(&s.article_id).copied().unwrap_or("Unknown Title");
            s.format_for_display(Some(title))
        })
        .collect()
}

/// Write formatted entries to `path`, separated by a blank line.
#[instrument(level = "info", skip_all, fields(path = %path.display(), entries = entries.len()))]
pub async fn save_summaries_to_file(entries: &[String], path: &Path) -> Result<()> {
    ensure_parent_dir(path).await?;
    fs::write(path, entries.join("\n\n")).await?;
    info!("Wrote summary report");
    Ok(())
}
