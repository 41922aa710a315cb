//! `kisslove` source: JSON API client for `klz9.com`.
//!
//! Every request is signed with a timestamp and a SHA-256 digest of
//! `"{timestamp}.{CLIENT_ID}"`. Listing payloads come either wrapped as
//! `{"items": [...]}` or as a bare array, and item fields vary in naming, so
//! parsing tries several keys per field.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

use super::http_client::{HttpTimeouts, build_source_http_client, fetch_json};
use super::utils::absolute_url;
use super::{Chapter, Manga, MangaDetails, SourceClient, SourceError};

const SOURCE_NAME: &str = "kisslove";
const DEFAULT_BASE_URL: &str = "https://klz9.com";
const CLIENT_ID: &str = "KL9K40zaSyC9K40vOMLLbEcepIFBhUKXwELqxlwTEF";
const DEFAULT_LATEST_LIMIT: u32 = 36;

/// Scanlator credit pages injected into chapters.
const FILTERED_IMAGES: &[&str] = &[
    "https://1.bp.blogspot.com/-ZMyVQcnjYyE/W2cRdXQb15I/AAAAAAACDnk/8X1Hm7wmhz4hLvpIzTNBHQnhuKu05Qb0gCHMYCw/s0/LHScan.png",
    "https://s4.imfaclub.com/images/20190814/Credit_LHScan_5d52edc2409e7.jpg",
    "https://s4.imfaclub.com/images/20200112/5e1ad960d67b2_5e1ad962338c7.jpg",
];

/// Retired image hosts and their current mirrors.
const IMAGE_HOST_MAP: &[(&str, &str)] = &[
    ("imfaclub.com", "j1.jfimv2.xyz"),
    ("s2.imfaclub.com", "j2.jfimv2.xyz"),
    ("s4.imfaclub.com", "j4.jfimv2.xyz"),
    ("ihlv1.xyz", "j1.jfimv2.xyz"),
    ("s2.ihlv1.xyz", "j2.jfimv2.xyz"),
    ("s4.ihlv1.xyz", "j4.jfimv2.xyz"),
    ("h1.klimv1.xyz", "j1.jfimv2.xyz"),
    ("h2.klimv1.xyz", "j2.jfimv2.xyz"),
    ("h4.klimv1.xyz", "j4.jfimv2.xyz"),
];

/// JSON API client for the `kisslove` source.
pub struct KissLoveClient {
    client: Client,
    base_url: String,
}

impl KissLoveClient {
    /// Creates a client against the public API.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the HTTP client cannot be constructed.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeouts)
    }

    /// Creates a client with a custom endpoint (used by integration tests).
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the HTTP client cannot be constructed.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, SourceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: build_source_http_client(SOURCE_NAME, &base_url, timeouts)?,
            base_url,
        })
    }

    /// Lists the most recently updated manga.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` on network, status, or payload failures.
    pub async fn latest(&self, page: u32, limit: Option<u32>) -> Result<Vec<Manga>, SourceError> {
        let limit = limit.unwrap_or(DEFAULT_LATEST_LIMIT);
        let data = self
            .get_json(
                "api/manga",
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(list_items(&data).iter().map(parse_manga).collect())
    }

    /// Lists today's trending manga.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` on network, status, or payload failures.
    pub async fn trending(&self) -> Result<Vec<Manga>, SourceError> {
        let data = self.get_json("api/manga/trending-daily", &[]).await?;
        Ok(list_items(&data).iter().map(parse_manga).collect())
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let endpoint = absolute_url(&self.base_url, path);
        let url = if params.is_empty() {
            endpoint
        } else {
            Url::parse_with_params(&endpoint, params)
                .map_err(|e| SourceError::parse(SOURCE_NAME, &endpoint, format!("bad URL: {e}")))?
                .to_string()
        };

        let (timestamp, signature) = signature_headers(unix_now());
        let request = self
            .client
            .get(&url)
            .header("X-Client-Sig", signature)
            .header("X-Client-Ts", timestamp);
        fetch_json(SOURCE_NAME, &url, request).await
    }
}

impl std::fmt::Debug for KissLoveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KissLoveClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SourceClient for KissLoveClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn http(&self) -> &Client {
        &self.client
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn search(&self, query: &str, page: u32) -> Result<Vec<Manga>, SourceError> {
        let data = self
            .get_json(
                "api/manga/list",
                &[
                    ("search", query.to_string()),
                    ("sort", "Popular".to_string()),
                    ("order", "desc".to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;
        let mangas: Vec<Manga> = list_items(&data).iter().map(parse_manga).collect();
        debug!(count = mangas.len(), "Search parsed");
        Ok(mangas)
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn manga_details(&self, slug: &str) -> Result<MangaDetails, SourceError> {
        let path = format!("api/manga/slug/{slug}");
        match self.get_json(&path, &[]).await? {
            Value::Object(fields) => Ok(MangaDetails::new(fields)),
            other => Err(SourceError::parse(
                SOURCE_NAME,
                absolute_url(&self.base_url, &path),
                format!("expected details object, got {}", json_kind(&other)),
            )),
        }
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn chapters(&self, slug: &str) -> Result<Vec<Chapter>, SourceError> {
        let details = self.manga_details(slug).await?;
        let mut chapters: Vec<Chapter> = details
            .get("chapters")
            .and_then(Value::as_array)
            .map(|raw| raw.iter().map(parse_chapter).collect())
            .unwrap_or_default();
        sort_chapters_descending(&mut chapters);
        debug!(count = chapters.len(), "Chapters parsed");
        Ok(chapters)
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<String>, SourceError> {
        let data = self.get_json(&format!("api/chapter/{chapter_id}"), &[]).await?;
        let content = data.get("content").and_then(Value::as_str).unwrap_or("");
        Ok(parse_page_content(content))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Returns `(timestamp, signature)` for the request headers.
fn signature_headers(timestamp: u64) -> (String, String) {
    let timestamp = timestamp.to_string();
    let digest = Sha256::digest(format!("{timestamp}.{CLIENT_ID}").as_bytes());
    (timestamp, hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn list_items(data: &Value) -> &[Value] {
    match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}

/// First non-empty value among `keys`, numbers rendered as strings.
fn first_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn parse_manga(raw: &Value) -> Manga {
    let slug = first_field(raw, &["slug", "url", "mangaSlug"]).unwrap_or_default();
    let title = first_field(raw, &["name", "title", "mangaName"]).unwrap_or_else(|| slug.clone());
    let cover = first_field(raw, &["cover", "thumbnail", "image"]);
    Manga::new(slug, title, cover)
}

fn parse_chapter(raw: &Value) -> Chapter {
    let slug = first_field(raw, &["slug", "chapter_slug", "chapterSlug"]);
    let id = first_field(raw, &["id", "chapter_id", "chapterId"])
        .or_else(|| slug.clone())
        .or_else(|| first_field(raw, &["chapter", "title", "name"]))
        .unwrap_or_else(|| "unknown".to_string());
    let slug = slug.unwrap_or_else(|| id.clone());
    let number = first_field(raw, &["chapter", "chapterNumber", "number"]);
    let title = first_field(raw, &["title", "name"]).unwrap_or_else(|| match &number {
        Some(number) => format!("Chapter {number}"),
        None => format!("Chapter {slug}"),
    });
    Chapter::new(id, slug, number, title)
}

fn chapter_sort_key(chapter: &Chapter) -> f64 {
    chapter
        .number
        .as_deref()
        .and_then(|n| n.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(-1.0)
}

/// Newest first; unnumbered chapters sink to the end in their original order.
fn sort_chapters_descending(chapters: &mut [Chapter]) {
    chapters.sort_by(|a, b| chapter_sort_key(b).total_cmp(&chapter_sort_key(a)));
}

fn parse_page_content(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !FILTERED_IMAGES.contains(line))
        .map(remap_image_host)
        .collect()
}

fn remap_image_host(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(new_host) = parsed.host_str().and_then(|host| {
        IMAGE_HOST_MAP
            .iter()
            .find(|(old, _)| *old == host)
            .map(|(_, new)| *new)
    }) else {
        return url.to_string();
    };
    if parsed.set_host(Some(new_host)).is_err() {
        return url.to_string();
    }
    parsed.to_string()
}
