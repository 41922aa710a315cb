//! Observer hooks for download progress.

use std::path::Path;

use crate::source::Chapter;

use super::error::DownloadError;

/// Receives progress events from the download engine.
///
/// Every method has a no-op default, so observers implement only what they
/// render. Calls happen on the downloading task; keep them cheap.
pub trait DownloadProgress: Send + Sync {
    /// A chapter is about to be downloaded with `total_pages` pages.
    fn chapter_started(&self, _chapter: &Chapter, _total_pages: usize) {}

    /// One page finished (downloaded or already present).
    fn page_completed(&self, _chapter: &Chapter, _index: usize, _skipped: bool) {}

    /// A chapter finished; `location` is its directory.
    fn chapter_completed(&self, _chapter: &Chapter, _location: &Path) {}

    /// A chapter failed and was abandoned.
    fn chapter_failed(&self, _chapter: &Chapter, _error: &DownloadError) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}
