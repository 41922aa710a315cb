//! Chapter download engine: pages to disk, optional CBZ, batch ranges.
//!
//! Downloads are idempotent. A page whose destination already exists is
//! skipped, and every page is streamed to a `.part` sibling first, so
//! re-running an interrupted chapter fetches only what is missing.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use manga_fetcher::download::{ChapterDownloader, NoProgress};
//! use manga_fetcher::source::{HttpTimeouts, build_default_source_registry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_source_registry(HttpTimeouts::default());
//! let client = registry.require("mangakatana")?;
//! let chapters = client.chapters("/manga/some-title.123").await?;
//! let downloader = ChapterDownloader::new(true);
//! let summary = downloader
//!     .download_range(client.as_ref(), "Some Title", &chapters[..2], Path::new("./manga"), &NoProgress)
//!     .await;
//! println!("{} completed, {} failed", summary.completed.len(), summary.failed.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::archive::write_cbz;
use super::error::DownloadError;
use super::filename::{chapter_archive_path, chapter_dir, page_file_name};
use super::progress::DownloadProgress;
use crate::source::{Chapter, SourceClient};

/// A chapter that finished downloading.
#[derive(Debug, Clone)]
pub struct CompletedChapter {
    /// The chapter.
    pub chapter: Chapter,
    /// Its directory on disk.
    pub path: PathBuf,
}

/// A chapter that was abandoned.
#[derive(Debug)]
pub struct FailedChapter {
    /// The chapter.
    pub chapter: Chapter,
    /// Why it failed.
    pub error: DownloadError,
}

/// Outcome of a batch download.
#[derive(Debug, Default)]
pub struct RangeDownloadSummary {
    /// Chapters downloaded successfully, in request order.
    pub completed: Vec<CompletedChapter>,
    /// Chapters that failed, in request order.
    pub failed: Vec<FailedChapter>,
}

impl RangeDownloadSummary {
    /// Number of chapters attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    /// True when nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// True when some but not all chapters failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.completed.is_empty()
    }
}

/// Downloads chapters of one manga into the storage layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChapterDownloader {
    cbz: bool,
}

impl ChapterDownloader {
    /// Creates a downloader; `cbz` enables archive packaging.
    #[must_use]
    pub fn new(cbz: bool) -> Self {
        Self { cbz }
    }

    /// Returns true when finished chapters are packaged as CBZ.
    #[must_use]
    pub fn cbz(&self) -> bool {
        self.cbz
    }

    /// Downloads one chapter and returns its directory.
    ///
    /// Page URLs are fetched from `client` unless `pages` is supplied. Page
    /// requests go through `client.http()` so per-site headers apply.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::EmptyPageList`] when the chapter has no pages
    /// - [`DownloadError::Source`] when the page list cannot be fetched
    /// - network, HTTP status and IO errors for the first failing page; pages
    ///   already written stay on disk and no archive is attempted
    #[instrument(skip(self, client, pages, progress), fields(source = client.name(), chapter = %chapter.title))]
    pub async fn download_chapter(
        &self,
        client: &dyn SourceClient,
        manga_title: &str,
        chapter: &Chapter,
        output_root: &Path,
        pages: Option<Vec<String>>,
        progress: &dyn DownloadProgress,
    ) -> Result<PathBuf, DownloadError> {
        let pages = match pages {
            Some(pages) if !pages.is_empty() => pages,
            _ => client.chapter_pages(&chapter.id).await?,
        };
        if pages.is_empty() {
            return Err(DownloadError::empty_page_list(&chapter.title));
        }

        let dir = chapter_dir(output_root, manga_title, &chapter.title);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DownloadError::io(dir.clone(), e))?;

        progress.chapter_started(chapter, pages.len());
        let mut fetched = 0_usize;
        for (offset, url) in pages.iter().enumerate() {
            let index = offset + 1;
            let dest = dir.join(page_file_name(index, url));
            let skipped = tokio::fs::try_exists(&dest).await.unwrap_or(false);
            if !skipped {
                fetch_page(client.http(), url, &dest).await?;
                fetched += 1;
            }
            progress.page_completed(chapter, index, skipped);
        }
        debug!(
            pages = pages.len(),
            fetched,
            skipped = pages.len() - fetched,
            "All pages present"
        );

        if self.cbz {
            let archive = chapter_archive_path(output_root, manga_title, &chapter.title);
            let (source_dir, target) = (dir.clone(), archive.clone());
            tokio::task::spawn_blocking(move || write_cbz(&source_dir, &target))
                .await
                .map_err(|e| DownloadError::archive(&archive, format!("archive task failed: {e}")))??;
        }

        info!(path = %dir.display(), "Chapter downloaded");
        Ok(dir)
    }

    /// Downloads `chapters` in order.
    ///
    /// A failing chapter is logged, reported to `progress`, and recorded in
    /// the summary; the batch moves on to the next chapter.
    #[instrument(skip(self, client, chapters, progress), fields(source = client.name(), count = chapters.len()))]
    pub async fn download_range(
        &self,
        client: &dyn SourceClient,
        manga_title: &str,
        chapters: &[Chapter],
        output_root: &Path,
        progress: &dyn DownloadProgress,
    ) -> RangeDownloadSummary {
        let mut summary = RangeDownloadSummary::default();
        for chapter in chapters {
            match self
                .download_chapter(client, manga_title, chapter, output_root, None, progress)
                .await
            {
                Ok(path) => {
                    progress.chapter_completed(chapter, &path);
                    summary.completed.push(CompletedChapter {
                        chapter: chapter.clone(),
                        path,
                    });
                }
                Err(error) => {
                    warn!(chapter = %chapter.title, error = %error, "Chapter download failed");
                    progress.chapter_failed(chapter, &error);
                    summary.failed.push(FailedChapter {
                        chapter: chapter.clone(),
                        error,
                    });
                }
            }
        }
        info!(
            completed = summary.completed.len(),
            failed = summary.failed.len(),
            "Range download finished"
        );
        summary
    }
}

/// Streams one page into `dest` via a `.part` sibling.
async fn fetch_page(http: &Client, url: &str, dest: &Path) -> Result<(), DownloadError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::network(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::http_status(url, status.as_u16()));
    }

    let part_path = partial_path(dest);
    let file = File::create(&part_path)
        .await
        .map_err(|e| DownloadError::io(part_path.clone(), e))?;

    if let Err(error) = stream_to_file(file, response, url, &part_path).await {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(error);
    }

    tokio::fs::rename(&part_path, dest)
        .await
        .map_err(|e| DownloadError::io(dest.to_path_buf(), e))
}

async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
    Ok(bytes_written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/m/c/001.jpg")),
            PathBuf::from("/m/c/001.jpg.part")
        );
    }

    #[test]
    fn test_downloader_reports_packaging_mode() {
        assert!(ChapterDownloader::new(true).cbz());
        assert!(!ChapterDownloader::new(false).cbz());
    }

    #[test]
    fn test_summary_partial_and_success() {
        let chapter = Chapter::new("1", "1", None, "One");
        let mut summary = RangeDownloadSummary::default();
        assert!(summary.is_success());
        assert!(!summary.is_partial());

        summary.completed.push(CompletedChapter {
            chapter: chapter.clone(),
            path: PathBuf::from("/m/One"),
        });
        summary.failed.push(FailedChapter {
            chapter,
            error: DownloadError::empty_page_list("One"),
        });
        assert!(!summary.is_success());
        assert!(summary.is_partial());
        assert_eq!(summary.total(), 2);
    }
}
