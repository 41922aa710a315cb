//! Browsing session: aggregated search, one active manga, a chapter range.
//!
//! # Architecture
//!
//! - [`aggregate_search`] - Same query across the active sources, fixed order
//! - [`RangeSelection`] - 1-based start/end bounds with clamped resolution
//! - [`reconcile`] - Downloaded set derived from storage presence
//! - [`SessionState`] - The active context with a generation counter
//! - [`SessionStore`] - Locked, atomically replaced JSON session file
//! - [`Session`] - Controller tying state, persistence and task guards
//!
//! # Example
//!
//! ```no_run
//! use manga_fetcher::download::{ChapterDownloader, NoProgress};
//! use manga_fetcher::session::{Session, SessionStore};
//! use manga_fetcher::source::{HttpTimeouts, build_default_source_registry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_source_registry(HttpTimeouts::default());
//! let session = Session::open(
//!     registry,
//!     SessionStore::at_default_location()?,
//!     "downloads",
//!     ChapterDownloader::new(false),
//! );
//! let results = session.search("blue lock", 1).await?;
//! let first = results.first().ok_or("no results")?;
//! session.select_manga(first.source.clone(), first.manga.clone())?;
//! session.load_chapters().await?;
//! session.click_advance(1)?;
//! session.click_advance(3)?;
//! let summary = session.download_selection(&NoProgress).await?;
//! println!("{} chapters downloaded", summary.completed.len());
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod controller;
mod error;
mod range;
mod reconcile;
mod state;
mod store;
mod tasks;

pub use aggregate::{ResultEntry, aggregate_search};
pub use controller::{ChapterRow, Session};
pub use error::SessionError;
pub use range::{ChapterPosition, RangeSelection};
pub use reconcile::{DownloadedSet, FsStorageProbe, StorageProbe, is_downloaded, reconcile};
pub use state::{ActiveManga, SessionState};
pub use store::{MangaCacheEntry, SessionCache, SessionStore, ThemeMode, default_session_path};
pub use tasks::TaskKind;
