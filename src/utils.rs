//! Utility functions for text cleanup, link resolution and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Whitespace normalisation for scraped text
//! - Resolution of page-relative links against the page URL
//! - String truncation for logging
//! - Writability check for the debug capture directory

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse runs of whitespace (including newlines from nested markup) into
/// single spaces and trim both ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  Kyiv:\n   sirens  "), "Kyiv: sirens");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Resolve an `href`/`src` value against the URL of the page it was found on.
///
/// Absolute URLs come back unchanged (normalised by the URL parser),
/// relative and protocol-relative ones are joined onto `base`.
pub fn resolve_link(base: &Url, href: &str) -> Result<String, url::ParseError> {
    base.join(href.trim()).map(|u| u.to_string())
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a character boundary at or below `max` bytes, with
/// an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
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

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Kyiv:\n   sirens  "), "Kyiv: sirens");
        assert_eq!(collapse_whitespace("\t\n"), "");
        assert_eq!(collapse_whitespace("one"), "one");
    }

    #[test]
    fn test_resolve_link() {
        let base = Url::parse("https://liveuamap.com/").unwrap();
        assert_eq!(
            resolve_link(&base, "/en/2024/1-march-shelling").unwrap(),
            "https://liveuamap.com/en/2024/1-march-shelling"
        );
        assert_eq!(
            resolve_link(&base, "https://twitter.com/x/status/1").unwrap(),
            "https://twitter.com/x/status/1"
        );
        assert_eq!(
            resolve_link(&base, "//cdn.example.com/a.jpg").unwrap(),
            "https://cdn.example.com/a.jpg"
        );
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        // "ї" is two bytes; cutting at 1 must back off to a char boundary.
        let result = truncate_for_log("їжак", 1);
        assert_eq!(result, "…(+8 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("debug").join("pages");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
