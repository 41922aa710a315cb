//! The session controller: state, persistence, and task guards together.
//!
//! All state mutations happen under one lock and each mutating action
//! persists the snapshot before the lock is released, so the session file
//! always reflects the latest action. Network work runs outside the lock.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use super::aggregate::{ResultEntry, aggregate_search};
use super::error::SessionError;
use super::range::{ChapterPosition, RangeSelection};
use super::reconcile::{DownloadedSet, FsStorageProbe, StorageProbe, is_downloaded, reconcile};
use super::state::{ActiveManga, SessionState};
use super::store::{SessionCache, SessionStore, ThemeMode};
use super::tasks::{TaskGuards, TaskKind};
use crate::download::{ChapterDownloader, DownloadProgress, RangeDownloadSummary};
use crate::source::{Chapter, Manga, SourceClient, SourceId, SourceRegistry};

/// One row of the chapter listing for the active manga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRow {
    /// 1-based position.
    pub index: usize,
    /// The chapter.
    pub chapter: Chapter,
    /// Relation to the current range.
    pub position: ChapterPosition,
    /// Whether the chapter is on disk.
    pub downloaded: bool,
}

/// A manga-browsing session over a set of sources.
pub struct Session {
    registry: SourceRegistry,
    store: SessionStore,
    probe: Arc<dyn StorageProbe>,
    output_root: PathBuf,
    downloader: ChapterDownloader,
    state: Mutex<SessionState>,
    tasks: TaskGuards,
}

impl Session {
    /// Opens a session, restoring whatever the store holds.
    pub fn open(
        registry: SourceRegistry,
        store: SessionStore,
        output_root: impl Into<PathBuf>,
        downloader: ChapterDownloader,
    ) -> Self {
        let output_root = output_root.into();
        let cache = store.load();
        let state = SessionState::from_cache(&cache, &registered_sources(&registry));
        debug!(
            sources = ?state.active_sources(),
            restored = state.active().is_some(),
            "Session opened"
        );
        Self {
            probe: Arc::new(FsStorageProbe::new(output_root.clone())),
            registry,
            store,
            output_root,
            downloader,
            state: Mutex::new(state),
            tasks: TaskGuards::default(),
        }
    }

    /// Replaces the storage probe used for reconciliation.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn StorageProbe>) -> Self {
        self.probe = probe;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &SessionState) {
        if let Err(error) = self.store.save(&state.to_cache()) {
            warn!(error = %error, "Session not saved");
        }
    }

    /// The source registry.
    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Output root for downloads.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Every registered source, in registry order.
    #[must_use]
    pub fn available_sources(&self) -> Vec<SourceId> {
        registered_sources(&self.registry)
    }

    /// Active sources, in selection order.
    #[must_use]
    pub fn active_sources(&self) -> Vec<SourceId> {
        self.lock().active_sources().to_vec()
    }

    /// Turns `source` on or off and returns the new active set.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] for an unknown source or
    /// when the last active source would be turned off.
    pub fn toggle_source(&self, source: &SourceId) -> Result<Vec<SourceId>, SessionError> {
        let available = self.available_sources();
        let mut state = self.lock();
        state.toggle_source(source, &available)?;
        self.persist(&state);
        info!(source = %source, active = ?state.active_sources(), "Sources toggled");
        Ok(state.active_sources().to_vec())
    }

    /// Searches all active sources.
    ///
    /// Results are stored as the session's result list only if no newer
    /// search started in the meantime; they are returned either way.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] while another search is running
    /// - [`SessionError::InvalidSelection`] when no source is active
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<ResultEntry>, SessionError> {
        let _permit = self.tasks.try_start(TaskKind::Search)?;
        let (generation, sources) = {
            let mut state = self.lock();
            let generation = state.begin_search(query);
            self.persist(&state);
            (generation, state.active_sources().to_vec())
        };

        let results = aggregate_search(&self.registry, &sources, query, page).await?;

        self.lock().apply_search(generation, results.clone());
        Ok(results)
    }

    /// Results of the newest applied search.
    #[must_use]
    pub fn results(&self) -> Vec<ResultEntry> {
        self.lock().results().to_vec()
    }

    /// Makes (`source`, `manga`) the active context.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] when `source` is not
    /// registered.
    pub fn select_manga(
        &self,
        source: SourceId,
        manga: Manga,
    ) -> Result<RangeSelection, SessionError> {
        if !self.registry.contains(source.as_str()) {
            return Err(SessionError::invalid_selection(format!(
                "unknown source '{source}'"
            )));
        }
        let mut state = self.lock();
        info!(source = %source, slug = %manga.slug, "Manga selected");
        state.select(source, manga);
        self.persist(&state);
        Ok(state.range())
    }

    /// The active manga, if any.
    #[must_use]
    pub fn active(&self) -> Option<ActiveManga> {
        self.lock().active().cloned()
    }

    fn active_client(&self) -> Result<(u64, ActiveManga, Arc<dyn SourceClient>), SessionError> {
        let (generation, active) = {
            let state = self.lock();
            let active = state
                .active()
                .cloned()
                .ok_or_else(SessionError::no_manga_selected)?;
            (state.generation(), active)
        };
        let client = self.registry.require(active.source.as_str())?;
        Ok((generation, active, client))
    }

    /// Fetches the chapter list of the active manga.
    ///
    /// Returns `Ok(None)` when the user switched to another manga while the
    /// request was in flight; the stale list is discarded.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] while another chapter load is running
    /// - [`SessionError::InvalidSelection`] without an active manga
    /// - [`SessionError::Source`] when the source request fails
    #[instrument(skip(self))]
    pub async fn load_chapters(&self) -> Result<Option<Vec<Chapter>>, SessionError> {
        let _permit = self.tasks.try_start(TaskKind::ChapterLoad)?;
        let (generation, active, client) = self.active_client()?;

        let chapters = client.chapters(&active.manga.slug).await?;
        let downloaded = reconcile(&chapters, self.probe.as_ref(), &active.manga.title);

        let mut state = self.lock();
        if !state.apply_chapters(generation, chapters.clone(), downloaded) {
            return Ok(None);
        }
        info!(count = chapters.len(), "Chapters loaded");
        Ok(Some(chapters))
    }

    /// Chapters loaded for the active manga.
    #[must_use]
    pub fn chapters(&self) -> Vec<Chapter> {
        self.lock().chapters().to_vec()
    }

    /// Recomputes the downloaded set of the active manga from storage.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn refresh_downloaded(&self) -> Result<DownloadedSet, SessionError> {
        let mut state = self.lock();
        let title = state
            .active()
            .map(|active| active.manga.title.clone())
            .ok_or_else(SessionError::no_manga_selected)?;
        let downloaded = reconcile(state.chapters(), self.probe.as_ref(), &title);
        let generation = state.generation();
        state.apply_downloaded(generation, downloaded.clone());
        Ok(downloaded)
    }

    fn update_range(
        &self,
        change: impl FnOnce(&mut RangeSelection),
    ) -> Result<RangeSelection, SessionError> {
        let mut state = self.lock();
        let range = state.update_range(change)?;
        self.persist(&state);
        debug!(start = ?range.start, end = ?range.end, "Range updated");
        Ok(range)
    }

    /// Sets the range start (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn set_start(&self, index: usize) -> Result<RangeSelection, SessionError> {
        self.update_range(|range| range.set_start(index))
    }

    /// Sets the range end (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn set_end(&self, index: usize) -> Result<RangeSelection, SessionError> {
        self.update_range(|range| range.set_end(index))
    }

    /// Applies a click on chapter `index` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn click_advance(&self, index: usize) -> Result<RangeSelection, SessionError> {
        self.update_range(|range| range.click_advance(index))
    }

    /// Unsets both bounds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn clear_range(&self) -> Result<RangeSelection, SessionError> {
        self.update_range(RangeSelection::clear)
    }

    /// Remembers the chapter cursor for the active manga.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn set_chapter_index(&self, index: usize) -> Result<(), SessionError> {
        let mut state = self.lock();
        state.set_chapter_index(index)?;
        self.persist(&state);
        Ok(())
    }

    /// Current range of the active manga.
    #[must_use]
    pub fn range(&self) -> RangeSelection {
        self.lock().range()
    }

    /// Resolves the range against the loaded chapter list.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga or
    /// when no chapters are loaded.
    pub fn resolve_selection(&self) -> Result<(usize, usize), SessionError> {
        let state = self.lock();
        if state.active().is_none() {
            return Err(SessionError::no_manga_selected());
        }
        state.range().resolve(state.chapters().len())
    }

    /// Chapters covered by the resolved range.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_selection`](Self::resolve_selection).
    pub fn selected_chapters(&self) -> Result<Vec<Chapter>, SessionError> {
        let state = self.lock();
        if state.active().is_none() {
            return Err(SessionError::no_manga_selected());
        }
        Ok(state.range().select(state.chapters())?.to_vec())
    }

    /// Listing rows for the loaded chapters.
    #[must_use]
    pub fn chapter_rows(&self) -> Vec<ChapterRow> {
        let state = self.lock();
        let range = state.range();
        state
            .chapters()
            .iter()
            .enumerate()
            .map(|(offset, chapter)| ChapterRow {
                index: offset + 1,
                chapter: chapter.clone(),
                position: range.position(offset + 1),
                downloaded: is_downloaded(state.downloaded(), chapter),
            })
            .collect()
    }

    /// `first -> last` summary of the selected range.
    #[must_use]
    pub fn range_summary(&self) -> Option<String> {
        let state = self.lock();
        state.range().summary(state.chapters())
    }

    /// Downloads the selected range of the active manga.
    ///
    /// Individual chapter failures are recorded in the summary. The
    /// downloaded set is refreshed afterwards unless the context changed.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] while another range download is running
    /// - [`SessionError::InvalidSelection`] without an active manga or
    ///   loaded chapters
    #[instrument(skip(self, progress))]
    pub async fn download_selection(
        &self,
        progress: &dyn DownloadProgress,
    ) -> Result<RangeDownloadSummary, SessionError> {
        let _permit = self.tasks.try_start(TaskKind::RangeDownload)?;
        // Context and chapter slice must come from the same snapshot.
        let (generation, active, selected) = {
            let state = self.lock();
            let active = state
                .active()
                .cloned()
                .ok_or_else(SessionError::no_manga_selected)?;
            let selected = state.range().select(state.chapters())?.to_vec();
            (state.generation(), active, selected)
        };
        let client = self.registry.require(active.source.as_str())?;
        info!(
            source = %active.source,
            title = %active.manga.title,
            count = selected.len(),
            cbz = self.downloader.cbz(),
            "Downloading range"
        );

        let summary = self
            .downloader
            .download_range(
                client.as_ref(),
                &active.manga.title,
                &selected,
                &self.output_root,
                progress,
            )
            .await;

        let mut state = self.lock();
        if state.generation() == generation {
            let downloaded =
                reconcile(state.chapters(), self.probe.as_ref(), &active.manga.title);
            state.apply_downloaded(generation, downloaded);
        }
        Ok(summary)
    }

    /// Sets the theme by name and returns the resulting mode.
    pub fn set_theme(&self, name: &str) -> ThemeMode {
        let mut state = self.lock();
        let mode = state.set_theme(name);
        self.persist(&state);
        mode
    }

    /// Snapshot of what would be persisted.
    #[must_use]
    pub fn snapshot(&self) -> SessionCache {
        self.lock().to_cache()
    }

    /// Session file path.
    #[must_use]
    pub fn store_path(&self) -> &Path {
        self.store.path()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("output_root", &self.output_root)
            .finish_non_exhaustive()
    }
}

fn registered_sources(registry: &SourceRegistry) -> Vec<SourceId> {
    registry.names().into_iter().map(SourceId::from).collect()
}
