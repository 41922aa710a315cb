//! Manga source clients behind a single capability trait.
//!
//! Every site is a black box to the rest of the crate: it can search, return
//! manga details, list chapters, and list page URLs. Concrete clients are
//! selected at runtime by identity through a [`SourceRegistry`].
//!
//! # Architecture
//!
//! - [`SourceClient`] - Async trait that every site implements
//! - [`SourceRegistry`] - Ordered collection of clients keyed by identity
//! - [`KissLoveClient`] - JSON API client for `klz9.com`
//! - [`MangaKatanaClient`] - HTML scraping client for `mangakatana.com`
//!
//! # Example
//!
//! ```no_run
//! use manga_fetcher::source::{HttpTimeouts, build_default_source_registry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_source_registry(HttpTimeouts::default());
//! let client = registry.require("mangakatana")?;
//! for manga in client.search("one piece", 1).await? {
//!     println!("{} [{}]", manga.title, manga.slug);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod kisslove;
mod mangakatana;
mod registry;
mod utils;

pub use error::SourceError;
pub use http_client::{
    CONNECT_TIMEOUT_SECS, HttpTimeouts, READ_TIMEOUT_SECS, build_source_http_client,
};
pub use kisslove::KissLoveClient;
pub use mangakatana::MangaKatanaClient;
pub use registry::SourceRegistry;

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Base URL overrides for the built-in sources (mirrors, test servers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceEndpoints {
    /// Overrides `https://klz9.com`.
    pub kisslove: Option<String>,
    /// Overrides `https://mangakatana.com`.
    pub mangakatana: Option<String>,
}

/// Builds the registry of built-in sources at their public endpoints.
#[must_use]
pub fn build_default_source_registry(timeouts: HttpTimeouts) -> SourceRegistry {
    build_source_registry(timeouts, &SourceEndpoints::default())
}

/// Builds the registry of built-in sources.
///
/// Order is deterministic: it is the order sources are listed to the user and
/// the default active source is the first one. A source whose client cannot
/// be built is logged and left out.
#[must_use]
pub fn build_source_registry(timeouts: HttpTimeouts, endpoints: &SourceEndpoints) -> SourceRegistry {
    let mut registry = SourceRegistry::new();

    let kisslove = match &endpoints.kisslove {
        Some(base_url) => KissLoveClient::with_base_url(base_url.clone(), timeouts),
        None => KissLoveClient::new(timeouts),
    };
    match kisslove {
        Ok(client) => registry.register(client),
        Err(error) => warn!(
            error = %error,
            "kisslove source unavailable; continuing with remaining sources"
        ),
    }

    let mangakatana = match &endpoints.mangakatana {
        Some(base_url) => MangaKatanaClient::with_base_url(base_url.clone(), timeouts),
        None => MangaKatanaClient::new(timeouts),
    };
    match mangakatana {
        Ok(client) => registry.register(client),
        Err(error) => warn!(
            error = %error,
            "mangakatana source unavailable; continuing with remaining sources"
        ),
    }

    registry
}

/// Opaque identity of a source client (e.g. `kisslove`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Creates an identity from its string key.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the string key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A manga as returned by a source search. Unique by slug within one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manga {
    /// Source-local identifier.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Cover image URL, when the source provides one.
    pub cover: Option<String>,
}

impl Manga {
    /// Creates a manga record.
    #[must_use]
    pub fn new(slug: impl Into<String>, title: impl Into<String>, cover: Option<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            cover,
        }
    }
}

/// A chapter entry in a manga's chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Identifier used to request the chapter's pages.
    pub id: String,
    /// Secondary identifier; equal to `id` on sources without a separate slug.
    pub slug: String,
    /// Chapter number as published (e.g. `"12.5"`).
    pub number: Option<String>,
    /// Display title.
    pub title: String,
}

impl Chapter {
    /// Creates a chapter record.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        slug: impl Into<String>,
        number: Option<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            number,
            title: title.into(),
        }
    }

    /// Label used in chapter listings: title plus number when known.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.number {
            Some(number) => format!("{} ({number})", self.title),
            None => self.title.clone(),
        }
    }
}

/// Key/value details for a manga, as returned by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MangaDetails {
    fields: Map<String, Value>,
}

impl MangaDetails {
    /// Wraps a JSON object of details.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns `key` as a non-empty string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Display title: `name`, then `title`, then `fallback`.
    #[must_use]
    pub fn title_or(&self, fallback: &str) -> String {
        self.get_str("name")
            .or_else(|| self.get_str("title"))
            .unwrap_or(fallback)
            .to_string()
    }

    /// All detail fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Capability every manga source implements.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Arc<dyn SourceClient>`, which the registry and session rely on.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Returns the source identity (e.g. "kisslove").
    fn name(&self) -> &str;

    /// HTTP client configured for this source, used for page downloads so
    /// site headers such as `Referer` apply.
    fn http(&self) -> &Client;

    /// Searches the source for `query`; `page` is 1-based.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<Manga>, SourceError>;

    /// Returns key/value details for a manga.
    async fn manga_details(&self, slug: &str) -> Result<MangaDetails, SourceError>;

    /// Returns the chapter list in source order.
    async fn chapters(&self, slug: &str) -> Result<Vec<Chapter>, SourceError>;

    /// Returns the ordered page image URLs for a chapter.
    async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<String>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_id_serializes_as_plain_string() {
        let id = SourceId::new("kisslove");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"kisslove\""));
        assert_eq!(id.to_string(), "kisslove");
    }

    #[test]
    fn test_chapter_label_includes_number_when_known() {
        let with_number = Chapter::new("1", "c1", Some("1".to_string()), "Chapter 1");
        assert_eq!(with_number.label(), "Chapter 1 (1)");
        let without = Chapter::new("2", "c2", None, "Extra");
        assert_eq!(without.label(), "Extra");
    }

    #[test]
    fn test_manga_details_title_prefers_name() {
        let Value::Object(fields) = json!({"name": "Named", "title": "Titled"}) else {
            unreachable!()
        };
        let details = MangaDetails::new(fields);
        assert_eq!(details.title_or("slug"), "Named");
    }

    #[test]
    fn test_manga_details_title_falls_back_to_slug() {
        let Value::Object(fields) = json!({"name": "  ", "other": 1}) else {
            unreachable!()
        };
        let details = MangaDetails::new(fields);
        assert_eq!(details.title_or("my-slug"), "my-slug");
    }
}
