//! Error types for the download module.
//!
//! Each variant carries the URL or path it concerns so a failed chapter in a
//! batch can be reported without extra bookkeeping by the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// Errors that can occur while downloading a chapter.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source returned no page URLs for the chapter.
    #[error("no pages found for {chapter}")]
    EmptyPageList {
        /// Chapter title.
        chapter: String,
    },

    /// Fetching the page list from the source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Network-level error while fetching a page image.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The page URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The image host answered with a non-success status.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The page URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing pages or directories.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Packaging the chapter as CBZ failed.
    #[error("failed to write archive {path}: {reason}")]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

impl DownloadError {
    /// Creates an empty page list error.
    pub fn empty_page_list(chapter: impl Into<String>) -> Self {
        Self::EmptyPageList {
            chapter: chapter.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an archive error.
    pub fn archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns true when the chapter simply had nothing to download.
    #[must_use]
    pub fn is_empty_page_list(&self) -> bool {
        matches!(self, Self::EmptyPageList { .. })
    }
}
