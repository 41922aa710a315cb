//! Chapter downloads: page files on disk, optional CBZ packaging.
//!
//! # Features
//!
//! - Streaming page downloads through the source's own HTTP client
//! - Resume by skipping pages already on disk; partial pages never count
//! - CBZ archive written only after every page succeeded
//! - Batch range downloads that survive individual chapter failures
//!
//! Storage layout is `<root>/<manga>/<chapter>/<NNN><ext>` with an optional
//! `<root>/<manga>/<chapter>.cbz`; see [`sanitize_filename`] for how titles
//! become path components.

mod archive;
mod engine;
mod error;
mod filename;
mod progress;

pub use engine::{ChapterDownloader, CompletedChapter, FailedChapter, RangeDownloadSummary};
pub use error::DownloadError;
pub use filename::{chapter_archive_path, chapter_dir, sanitize_filename};
pub use progress::{DownloadProgress, NoProgress};
