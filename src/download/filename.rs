//! Filename sanitization and on-disk layout for downloaded chapters.
//!
//! Layout: `<root>/<manga>/<chapter>/<NNN><ext>` plus an optional
//! `<root>/<manga>/<chapter>.cbz`. Reconciliation derives the same paths, so
//! both sides go through these helpers.

use std::path::{Path, PathBuf};

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const DEFAULT_PAGE_EXTENSION: &str = ".jpg";

/// Makes `name` safe as a single path component on every major filesystem.
///
/// Reserved characters become `_`, surrounding whitespace and dots are
/// trimmed, and an empty result becomes `untitled`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = replaced.trim().trim_matches('.');
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Extension of the URL path (query ignored), with the leading dot.
///
/// Defaults to `.jpg` when the last segment has no extension.
pub(crate) fn extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rfind('.') {
        Some(dot) if dot + 1 < last_segment.len() => last_segment[dot..].to_string(),
        _ => DEFAULT_PAGE_EXTENSION.to_string(),
    }
}

/// File name for the 1-based page `index`.
pub(crate) fn page_file_name(index: usize, url: &str) -> String {
    format!("{index:03}{}", extension_from_url(url))
}

/// `<root>/<manga>`.
pub(crate) fn manga_dir(output_root: &Path, manga_title: &str) -> PathBuf {
    output_root.join(sanitize_filename(manga_title))
}

/// `<root>/<manga>/<chapter>`.
#[must_use]
pub fn chapter_dir(output_root: &Path, manga_title: &str, chapter_title: &str) -> PathBuf {
    manga_dir(output_root, manga_title).join(sanitize_filename(chapter_title))
}

/// `<root>/<manga>/<chapter>.cbz`.
#[must_use]
pub fn chapter_archive_path(output_root: &Path, manga_title: &str, chapter_title: &str) -> PathBuf {
    manga_dir(output_root, manga_title).join(format!("{}.cbz", sanitize_filename(chapter_title)))
}
