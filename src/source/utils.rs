//! Shared helpers for source implementations.

use regex::Regex;
use scraper::Selector;
use url::Url;

/// Compiles a static regex pattern, panicking with context if invalid.
///
/// Only used for compile-time constant patterns inside `LazyLock`.
#[must_use]
#[allow(clippy::panic)]
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Compiles a static CSS selector, panicking with context if invalid.
#[must_use]
#[allow(clippy::panic)]
pub fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e}"))
}

/// Reduces an absolute link to its path; relative links gain a leading slash.
///
/// Scraped sources use URL paths as slugs and chapter ids.
#[must_use]
pub fn normalize_slug(href: &str) -> String {
    let href = href.trim();
    if let Ok(parsed) = Url::parse(href)
        && parsed.has_host()
    {
        return parsed.path().to_string();
    }
    if href.starts_with('/') {
        href.to_string()
    } else {
        format!("/{href}")
    }
}

/// Joins a slug or relative path onto a base URL.
#[must_use]
pub fn absolute_url(base_url: &str, slug: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        slug.trim_start_matches('/')
    )
}

/// Resolves `value` relative to `base_url`, passing absolute URLs through.
#[must_use]
pub fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}
