//! In-memory session state: the single active (source, manga) context.
//!
//! Every context switch bumps a generation counter. Background work captures
//! the generation when it starts and its result is applied only if the
//! counter is unchanged, so a slow chapter load for a manga the user already
//! left is discarded instead of overwriting the new context.

use std::collections::BTreeMap;

use tracing::debug;

use super::aggregate::ResultEntry;
use super::error::SessionError;
use super::range::RangeSelection;
use super::reconcile::DownloadedSet;
use super::store::{MangaCacheEntry, SessionCache, ThemeMode};
use crate::source::{Chapter, Manga, SourceId};

/// The manga the session is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveManga {
    /// Source the manga belongs to.
    pub source: SourceId,
    /// The manga.
    pub manga: Manga,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CachedRange {
    range: RangeSelection,
    chapter_index: Option<usize>,
}

/// Mutable session state guarded by the session controller.
#[derive(Debug, Default)]
pub struct SessionState {
    active_sources: Vec<SourceId>,
    active: Option<ActiveManga>,
    range: RangeSelection,
    chapter_index: Option<usize>,
    chapters: Vec<Chapter>,
    downloaded: DownloadedSet,
    generation: u64,
    search_generation: u64,
    last_query: Option<String>,
    results: Vec<ResultEntry>,
    theme: ThemeMode,
    theme_name: Option<String>,
    range_cache: BTreeMap<(SourceId, String), CachedRange>,
}

impl SessionState {
    /// Rebuilds state from a persisted snapshot.
    ///
    /// Sources no longer in `available` are dropped; when none remain, the
    /// first available source becomes active. The last selection is restored
    /// only if its source is still available.
    #[must_use]
    pub fn from_cache(cache: &SessionCache, available: &[SourceId]) -> Self {
        let mut active_sources: Vec<SourceId> = Vec::new();
        for source in &cache.sources {
            if available.contains(source) && !active_sources.contains(source) {
                active_sources.push(source.clone());
            }
        }
        if active_sources.is_empty()
            && let Some(first) = available.first()
        {
            active_sources.push(first.clone());
        }

        let range_cache = cache
            .manga_cache
            .iter()
            .map(|entry| {
                (
                    (entry.source.clone(), entry.slug.clone()),
                    CachedRange {
                        range: entry.range(),
                        chapter_index: entry.chapter_index,
                    },
                )
            })
            .collect();

        let mut state = Self {
            active_sources,
            last_query: cache.last_query.clone(),
            theme: cache.theme,
            theme_name: cache.theme_name.clone(),
            range_cache,
            ..Self::default()
        };

        if let (Some(source), Some(slug)) = (&cache.selected_source, &cache.selected_slug)
            && available.contains(source)
        {
            let title = cache.selected_title.clone().unwrap_or_else(|| slug.clone());
            state.select(source.clone(), Manga::new(slug.clone(), title, None));
            if state.range.is_empty() {
                state.range = RangeSelection::new(cache.range_start, cache.range_end);
                state.remember_range();
            }
        }
        state
    }

    /// Snapshot for persistence.
    #[must_use]
    pub fn to_cache(&self) -> SessionCache {
        SessionCache {
            last_query: self.last_query.clone(),
            selected_source: self.active.as_ref().map(|a| a.source.clone()),
            selected_slug: self.active.as_ref().map(|a| a.manga.slug.clone()),
            selected_title: self.active.as_ref().map(|a| a.manga.title.clone()),
            range_start: self.range.start,
            range_end: self.range.end,
            sources: self.active_sources.clone(),
            theme: self.theme,
            theme_name: self.theme_name.clone(),
            manga_cache: self
                .range_cache
                .iter()
                .map(|((source, slug), cached)| MangaCacheEntry {
                    source: source.clone(),
                    slug: slug.clone(),
                    range_start: cached.range.start,
                    range_end: cached.range.end,
                    chapter_index: cached.chapter_index,
                })
                .collect(),
        }
    }

    /// Active sources in selection order.
    #[must_use]
    pub fn active_sources(&self) -> &[SourceId] {
        &self.active_sources
    }

    /// The active manga, if any.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveManga> {
        self.active.as_ref()
    }

    /// Range of the active manga.
    #[must_use]
    pub fn range(&self) -> RangeSelection {
        self.range
    }

    /// Cached chapter cursor of the active manga.
    #[must_use]
    pub fn chapter_index(&self) -> Option<usize> {
        self.chapter_index
    }

    /// Chapters loaded for the active manga.
    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Downloaded set of the active manga.
    #[must_use]
    pub fn downloaded(&self) -> &DownloadedSet {
        &self.downloaded
    }

    /// Current context generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last search query.
    #[must_use]
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Results of the newest applied search.
    #[must_use]
    pub fn results(&self) -> &[ResultEntry] {
        &self.results
    }

    /// Presentation mode.
    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    /// Theme name, if one was chosen.
    #[must_use]
    pub fn theme_name(&self) -> Option<&str> {
        self.theme_name.as_deref()
    }

    /// Switches the active context and returns the new generation.
    ///
    /// The cached range for the new key is restored; an unknown key starts
    /// with both bounds unset. Loaded chapters and the downloaded set are
    /// cleared.
    pub fn select(&mut self, source: SourceId, manga: Manga) -> u64 {
        let cached = self
            .range_cache
            .get(&(source.clone(), manga.slug.clone()))
            .copied()
            .unwrap_or_default();
        self.range = cached.range;
        self.chapter_index = cached.chapter_index;
        self.chapters.clear();
        self.downloaded.clear();
        self.active = Some(ActiveManga { source, manga });
        self.generation += 1;
        debug!(generation = self.generation, "Active context switched");
        self.generation
    }

    /// Applies `change` to the active range and caches the result.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn update_range(
        &mut self,
        change: impl FnOnce(&mut RangeSelection),
    ) -> Result<RangeSelection, SessionError> {
        if self.active.is_none() {
            return Err(SessionError::no_manga_selected());
        }
        change(&mut self.range);
        self.remember_range();
        Ok(self.range)
    }

    /// Records the chapter cursor for the active manga.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] without an active manga.
    pub fn set_chapter_index(&mut self, index: usize) -> Result<(), SessionError> {
        if self.active.is_none() {
            return Err(SessionError::no_manga_selected());
        }
        self.chapter_index = Some(index);
        self.remember_range();
        Ok(())
    }

    fn remember_range(&mut self) {
        if let Some(active) = &self.active {
            self.range_cache.insert(
                (active.source.clone(), active.manga.slug.clone()),
                CachedRange {
                    range: self.range,
                    chapter_index: self.chapter_index,
                },
            );
        }
    }

    /// Records a new search and returns its generation.
    pub fn begin_search(&mut self, query: &str) -> u64 {
        self.last_query = Some(query.to_string());
        self.search_generation += 1;
        self.search_generation
    }

    /// Stores search results if `generation` is still the newest search.
    pub fn apply_search(&mut self, generation: u64, results: Vec<ResultEntry>) -> bool {
        if generation != self.search_generation {
            debug!(generation, newest = self.search_generation, "Stale search results dropped");
            return false;
        }
        self.results = results;
        true
    }

    /// Stores a chapter list if the context is unchanged since `generation`.
    pub fn apply_chapters(
        &mut self,
        generation: u64,
        chapters: Vec<Chapter>,
        downloaded: DownloadedSet,
    ) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Stale chapter list dropped");
            return false;
        }
        self.chapters = chapters;
        self.downloaded = downloaded;
        true
    }

    /// Stores a downloaded set if the context is unchanged since `generation`.
    pub fn apply_downloaded(&mut self, generation: u64, downloaded: DownloadedSet) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Stale downloaded set dropped");
            return false;
        }
        self.downloaded = downloaded;
        true
    }

    /// Flips `source` in the active set. A newly enabled source goes last,
    /// so the active list keeps the order sources were turned on.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] for an unknown source or
    /// when the last active source would be turned off.
    pub fn toggle_source(
        &mut self,
        source: &SourceId,
        available: &[SourceId],
    ) -> Result<(), SessionError> {
        if !available.contains(source) {
            return Err(SessionError::invalid_selection(format!(
                "unknown source '{source}'"
            )));
        }
        if let Some(position) = self.active_sources.iter().position(|s| s == source) {
            if self.active_sources.len() == 1 {
                return Err(SessionError::invalid_selection(
                    "at least one source must stay active",
                ));
            }
            self.active_sources.remove(position);
        } else {
            self.active_sources.push(source.clone());
        }
        Ok(())
    }

    /// Sets the theme by name; the mode follows the name.
    pub fn set_theme(&mut self, name: &str) -> ThemeMode {
        self.theme = ThemeMode::from_theme_name(name);
        self.theme_name = Some(name.to_string());
        self.theme
    }
}
