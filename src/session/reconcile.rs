//! Which chapters are already on disk.
//!
//! A chapter counts as downloaded when its directory or its `.cbz` exists.
//! Page counts are not checked.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::download::{chapter_archive_path, chapter_dir};
use crate::source::Chapter;

/// Chapter ids and slugs judged complete for one manga.
pub type DownloadedSet = HashSet<String>;

/// Answers whether a chapter is present in storage.
pub trait StorageProbe: Send + Sync {
    /// True when `chapter_title` of `manga_title` is stored as a directory
    /// or an archive.
    fn chapter_present(&self, manga_title: &str, chapter_title: &str) -> bool;
}

/// Probe over the download layout rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsStorageProbe {
    root: PathBuf,
}

impl FsStorageProbe {
    /// Creates a probe over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageProbe for FsStorageProbe {
    fn chapter_present(&self, manga_title: &str, chapter_title: &str) -> bool {
        chapter_dir(&self.root, manga_title, chapter_title).exists()
            || chapter_archive_path(&self.root, manga_title, chapter_title).exists()
    }
}

/// Recomputes the downloaded set for `chapters` from scratch.
///
/// Both the id and the slug of every present chapter are inserted, so either
/// can be used for lookups.
#[must_use]
pub fn reconcile(chapters: &[Chapter], probe: &dyn StorageProbe, manga_title: &str) -> DownloadedSet {
    let mut downloaded = DownloadedSet::new();
    for chapter in chapters {
        if probe.chapter_present(manga_title, &chapter.title) {
            downloaded.insert(chapter.id.clone());
            downloaded.insert(chapter.slug.clone());
        }
    }
    debug!(
        manga = manga_title,
        present = downloaded.len(),
        "Downloaded set reconciled"
    );
    downloaded
}

/// True when `chapter` is in `downloaded` by id or slug.
#[must_use]
pub fn is_downloaded(downloaded: &DownloadedSet, chapter: &Chapter) -> bool {
    downloaded.contains(&chapter.id) || downloaded.contains(&chapter.slug)
}
