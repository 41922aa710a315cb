//! Manga Fetcher Core Library
//!
//! This library fetches manga metadata and page images from several web
//! sources and writes them to local storage, optionally packaged as CBZ
//! archives.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`source`] - Source clients (`kisslove`, `mangakatana`) behind one async trait
//! - [`download`] - Chapter download engine with resumable page fetching
//! - [`session`] - Multi-source aggregation, range selection, and session persistence

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod session;
pub mod source;
mod user_agent;

// Re-export commonly used types
pub use download::{
    ChapterDownloader, DownloadError, DownloadProgress, RangeDownloadSummary, sanitize_filename,
};
pub use session::{
    FsStorageProbe, RangeSelection, ResultEntry, Session, SessionCache, SessionError,
    SessionState, SessionStore, StorageProbe, aggregate_search, reconcile,
};
pub use source::{
    Chapter, HttpTimeouts, Manga, MangaDetails, SourceClient, SourceEndpoints, SourceError,
    SourceId, SourceRegistry, build_default_source_registry, build_source_registry,
};
