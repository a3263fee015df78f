//! Text processing and file system helpers.
//!
//! This module provides helper functions used throughout the application:
//! - Theme matching for filtering fetched headlines
//! - Text cleanup before summarization (HTML removal, whitespace collapsing)
//! - String truncation for logs and display
//! - Output directory preparation

use crate::error::Result;
use crate::models::Article;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Trailing `[+1234 chars]` marker the headline service appends to clipped content.
static TRUNCATION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[\+\d+ chars\]\s*$").expect("valid truncation regex"));

/// Keep articles mentioning at least one theme.
///
/// Matching is a case-insensitive substring test against the title,
/// description, and content. The first matching theme (in `themes` order) is
/// recorded in [`Article::themes`]. With no themes every article is kept
/// unchanged.
#[instrument(level = "info", skip_all, fields(articles = articles.len(), themes = themes.len()))]
pub fn filter_articles_by_theme(articles: Vec<Article>, themes: &[String]) -> Vec<Article> {
    if themes.is_empty() {
        warn!("No themes provided for filtering");
        return articles;
    }

    let total = articles.len();
    let lowered: Vec<String> = themes.iter().map(|t| t.to_lowercase()).collect();

    let filtered: Vec<Article> = articles
        .into_iter()
        .filter_map(|mut article| {
            let haystacks = [
                article.title.to_lowercase(),
                article.description.as_deref().unwrap_or("").to_lowercase(),
                article.content.as_deref().unwrap_or("").to_lowercase(),
            ];
            let idx = lowered
                .iter()
                .position(|theme| haystacks.iter().any(|h| h.contains(theme.as_str())))?;
            if !article.themes.contains(&themes[idx]) {
                article.themes.push(themes[idx].clone());
            }
            Some(article)
        })
        .collect();

    info!(
        kept = filtered.len(),
        total,
        themes = %themes.join(", "),
        "Filtered articles by theme"
    );
    filtered
}

/// Candidate themes that occur in `text`, case-insensitively, in candidate order.
pub fn extract_themes_from_text(text: &str, candidates: &[String]) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let lowered = text.to_lowercase();
    candidates
        .iter()
        .filter(|theme| lowered.contains(&theme.to_lowercase()))
        .cloned()
        .collect()
}

/// Strip HTML tags, collapse whitespace runs to single spaces, and trim.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(text);
    let plain: String = fragment.root_element().text().collect();
    plain.split_whitespace().join(" ")
}

/// Remove the headline service's `[+N chars]` suffix, if present.
pub fn strip_truncation_marker(text: &str) -> &str {
    match TRUNCATION_MARKER.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Cleaned text of an article, ready to be summarized. May be empty.
pub fn article_text(article: &Article) -> String {
    clean_text(strip_truncation_marker(article.text_for_summary()))
}

/// Truncate `text` to at most `max_chars` characters.
///
/// Trailing whitespace left by the cut is removed and `...` appended when
/// `ellipsis` is set. Text that already fits is returned unchanged.
pub fn truncate_text(text: &str, max_chars: usize, ellipsis: bool) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.truncate(truncated.trim_end().len());
    if ellipsis {
        truncated.push_str("...");
    }
    truncated
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at the last character boundary at or before `max`
/// bytes with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Display form shared by the text report and [`crate::models::Summary`].
pub fn format_summary(title: &str, summary: &str) -> String {
    format!("Title: {title}\nSummary: {summary}")
}

/// Create the parent directory of `path` if it has one.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
        debug!(dir = %parent.display(), "Ensured output directory");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(title: &str, description: Option<&str>, content: Option<&str>) -> Article {
        let mut a = Article::from_api(Default::default(), Utc::now());
        a.title = title.to_string();
        a.description = description.map(str::to_string);
        a.content = content.map(str::to_string);
        a
    }

    fn themes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_articles_by_theme_matches_any_field() {
        let articles = vec![
            article("Markets rally", None, None),
            article("Local news", Some("New HEALTH guidance"), None),
            article("Sports", None, Some("Nothing relevant")),
            article("Chips", None, Some("technology and finance")),
        ];

        let kept = filter_articles_by_theme(articles, &themes(&["technology", "health", "finance"]));

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "Local news");
        assert_eq!(kept[0].themes, vec!["health"]);
        assert_eq!(kept[1].title, "Chips");
        assert_eq!(kept[1].themes, vec!["technology"]);
    }

    #[test]
    fn test_filter_articles_without_themes_keeps_all() {
        let articles = vec![article("a", None, None), article("b", None, None)];
        let kept = filter_articles_by_theme(articles, &[]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|a| a.themes.is_empty()));
    }

    #[test]
    fn test_extract_themes_from_text() {
        let found = extract_themes_from_text(
            "Finance ministers discuss Health budgets",
            &themes(&["technology", "health", "finance"]),
        );
        assert_eq!(found, vec!["health", "finance"]);
        assert!(extract_themes_from_text("", &themes(&["x"])).is_empty());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("<p>Hello   <b>world</b></p>\n\n<div>again</div>"),
            "Hello world again"
        );
        assert_eq!(clean_text("  plain\ttext \n"), "plain text");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_strip_truncation_marker() {
        assert_eq!(
            strip_truncation_marker("The story so far… [+2345 chars]"),
            "The story so far…"
        );
        assert_eq!(strip_truncation_marker("No marker"), "No marker");
    }

    #[test]
    fn test_article_text_prefers_content_and_cleans() {
        let a = article("t", Some("desc"), Some("<p>Body  text</p> [+10 chars]"));
        assert_eq!(article_text(&a), "Body text");
        let b = article("t", Some(" <i>desc</i> "), None);
        assert_eq!(article_text(&b), "desc");
        let c = article("t", None, None);
        assert_eq!(article_text(&c), "");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10, true), "short");
        assert_eq!(truncate_text("hello world again", 6, true), "hello...");
        assert_eq!(truncate_text("hello world", 5, false), "hello");
        assert_eq!(truncate_text("héllo wörld", 4, true), "héll...");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let result = truncate_for_log("ééé", 3);
        assert_eq!(result, "é…(+4 bytes)");
    }

    #[test]
    fn test_format_summary() {
        assert_eq!(format_summary("T", "S"), "Title: T\nSummary: S");
    }

    #[tokio::test]
    async fn test_ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/out.txt");
        ensure_parent_dir(&target).await.unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent_dir(Path::new("bare.txt")).await.unwrap();
    }
}
