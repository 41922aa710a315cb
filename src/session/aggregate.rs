//! Search across several sources at once.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::error::SessionError;
use crate::source::{Manga, SourceId, SourceRegistry};

/// A search hit tagged with the source it came from.
///
/// Slugs are only unique within one source, so identity is the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Source the manga was found on.
    pub source: SourceId,
    /// The manga.
    pub manga: Manga,
}

impl ResultEntry {
    /// Creates a result entry.
    #[must_use]
    pub fn new(source: SourceId, manga: Manga) -> Self {
        Self { source, manga }
    }
}

/// Searches every source in `sources` with the same query.
///
/// Sources are queried concurrently but results are grouped by source in
/// the order given, each source's own order preserved. A failing or unknown
/// source is logged and contributes nothing.
///
/// # Errors
///
/// Returns [`SessionError::InvalidSelection`] when `sources` is empty; no
/// request is made in that case.
#[instrument(skip(registry), fields(source_count = sources.len()))]
pub async fn aggregate_search(
    registry: &SourceRegistry,
    sources: &[SourceId],
    query: &str,
    page: u32,
) -> Result<Vec<ResultEntry>, SessionError> {
    if sources.is_empty() {
        return Err(SessionError::invalid_selection("no source selected"));
    }

    let searches = sources.iter().map(|source| async move {
        let Some(client) = registry.get(source.as_str()) else {
            warn!(source = %source, "Unknown source skipped");
            return Vec::new();
        };
        match client.search(query, page).await {
            Ok(mangas) => {
                debug!(source = %source, count = mangas.len(), "Source search finished");
                mangas
                    .into_iter()
                    .map(|manga| ResultEntry::new(source.clone(), manga))
                    .collect()
            }
            Err(error) => {
                warn!(source = %source, error = %error, "Source search failed");
                Vec::new()
            }
        }
    });

    let results: Vec<ResultEntry> = join_all(searches).await.into_iter().flatten().collect();
    debug!(count = results.len(), "Aggregated search finished");
    Ok(results)
}
