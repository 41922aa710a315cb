//! `mangakatana` source: HTML scraping client for `mangakatana.com`.
//!
//! Slugs and chapter ids are URL paths. Page URLs are not in the DOM; the
//! reader page embeds them in an inline script as a JavaScript array whose
//! name is referenced next to a `data-src` string, so page extraction is a
//! two-step regex match over that script.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use super::http_client::{HttpTimeouts, build_source_http_client, fetch_text};
use super::utils::{
    absolute_url, absolutize_url, compile_static_regex, compile_static_selector, normalize_slug,
};
use super::{Chapter, Manga, MangaDetails, SourceClient, SourceError};

const SOURCE_NAME: &str = "mangakatana";
const DEFAULT_BASE_URL: &str = "https://mangakatana.com";

static IMAGE_ARRAY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"data-src['"],\s*(\w+)"#));
static IMAGE_URL_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"'([^']*)'"));
static CHAPTER_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(\d+\.\d+|\d+)"));

static BOOK_ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("div#book_list > div.item"));
static BOOK_TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("div.text > h3 > a"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("img"));
static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("h1.heading"));
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("tr"));
static CHAPTER_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".chapter"));
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a"));
static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("script"));

/// HTML scraping client for the `mangakatana` source.
pub struct MangaKatanaClient {
    client: Client,
    base_url: String,
}

impl MangaKatanaClient {
    /// Creates a client against the public site.
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

    async fn get_html(&self, url: &str) -> Result<String, SourceError> {
        fetch_text(SOURCE_NAME, url, self.client.get(url)).await
    }

    fn base(&self) -> Result<Url, SourceError> {
        Url::parse(&format!("{}/", self.base_url)).map_err(|e| {
            SourceError::parse(SOURCE_NAME, &self.base_url, format!("invalid base URL: {e}"))
        })
    }
}

impl std::fmt::Debug for MangaKatanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MangaKatanaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SourceClient for MangaKatanaClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn http(&self) -> &Client {
        &self.client
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn search(&self, query: &str, page: u32) -> Result<Vec<Manga>, SourceError> {
        let url = if query.trim().is_empty() {
            absolute_url(&self.base_url, &format!("manga/page/{page}"))
        } else {
            let endpoint = absolute_url(&self.base_url, &format!("page/{page}"));
            Url::parse_with_params(&endpoint, &[("search", query), ("search_by", "book_name")])
                .map_err(|e| SourceError::parse(SOURCE_NAME, &endpoint, format!("bad URL: {e}")))?
                .to_string()
        };
        let html = self.get_html(&url).await?;
        let mangas = parse_manga_list(&html, &self.base()?);
        debug!(count = mangas.len(), "Search parsed");
        Ok(mangas)
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn manga_details(&self, slug: &str) -> Result<MangaDetails, SourceError> {
        let html = self.get_html(&absolute_url(&self.base_url, slug)).await?;
        let name = parse_heading(&html).unwrap_or_else(|| slug.to_string());

        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.clone()));
        fields.insert("title".to_string(), Value::String(name));
        fields.insert("slug".to_string(), Value::String(slug.to_string()));
        Ok(MangaDetails::new(fields))
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn chapters(&self, slug: &str) -> Result<Vec<Chapter>, SourceError> {
        let html = self.get_html(&absolute_url(&self.base_url, slug)).await?;
        let chapters = parse_chapter_rows(&html);
        debug!(count = chapters.len(), "Chapters parsed");
        Ok(chapters)
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<String>, SourceError> {
        let html = self.get_html(&absolute_url(&self.base_url, chapter_id)).await?;
        Ok(parse_page_urls(&html))
    }
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_manga_list(html: &str, base_url: &Url) -> Vec<Manga> {
    let document = Html::parse_document(html);
    document
        .select(&BOOK_ITEM_SEL)
        .filter_map(|item| {
            let anchor = item.select(&BOOK_TITLE_SEL).next()?;
            let href = anchor.value().attr("href")?;
            let cover = item
                .select(&IMG_SEL)
                .next()
                .and_then(|img| img.value().attr("src"))
                .filter(|src| !src.trim().is_empty())
                .and_then(|src| absolutize_url(src, base_url));
            Some(Manga::new(normalize_slug(href), element_text(anchor), cover))
        })
        .collect()
}

fn parse_heading(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&HEADING_SEL)
        .next()
        .map(element_text)
        .filter(|name| !name.is_empty())
}

fn parse_chapter_rows(html: &str) -> Vec<Chapter> {
    let document = Html::parse_document(html);
    document
        .select(&ROW_SEL)
        .filter(|row| row.select(&CHAPTER_CELL_SEL).next().is_some())
        .filter_map(|row| {
            let anchor = row.select(&ANCHOR_SEL).next()?;
            let href = anchor.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let title = element_text(anchor);
            let number = extract_chapter_number(&title);
            let slug = normalize_slug(href);
            Some(Chapter::new(slug.clone(), slug, number, title))
        })
        .collect()
}

fn extract_chapter_number(title: &str) -> Option<String> {
    CHAPTER_NUMBER_RE
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_page_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(script) = document
        .select(&SCRIPT_SEL)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains("data-src"))
    else {
        return Vec::new();
    };
    extract_image_array(&script)
}

fn extract_image_array(script: &str) -> Vec<String> {
    let Some(array_name) = IMAGE_ARRAY_NAME_RE
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    let pattern = format!(r"var\s+{}\s*=\s*\[([^\]]*)\]", regex::escape(array_name));
    let Ok(array_re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let Some(blob) = array_re
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    IMAGE_URL_RE
        .captures_iter(blob)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEARCH_HTML: &str = r#"
        <html><body><div id="book_list">
          <div class="item">
            <div class="wrap_img"><a href="https://mangakatana.com/manga/blue-lock.25032"><img src="/imgs/blue.jpg"></a></div>
            <div class="text"><h3><a href="https://mangakatana.com/manga/blue-lock.25032"> Blue Lock </a></h3></div>
          </div>
          <div class="item">
            <div class="text"><h3><a href="/manga/kaiju-no-8.24000">Kaiju No. 8</a></h3></div>
          </div>
          <div class="item"><div class="text"><h3><a>No link</a></h3></div></div>
        </div></body></html>
    "#;

    const CHAPTERS_HTML: &str = r#"
        <html><body>
          <h1 class="heading">Blue Lock</h1>
          <table>
            <tr><td><div class="chapter"><a href="https://mangakatana.com/manga/blue-lock.25032/c250.5">Chapter 250.5: Extra</a></div></td></tr>
            <tr><td><div class="chapter"><a href="https://mangakatana.com/manga/blue-lock.25032/c250">Chapter 250</a></div></td></tr>
            <tr><td><div class="update_time">ignored row</div><a href="/elsewhere">x</a></td></tr>
            <tr><td><div class="chapter"><a href="/manga/blue-lock.25032/oneshot">Oneshot</a></div></td></tr>
          </table>
        </body></html>
    "#;

    const READER_HTML: &str = r#"
        <html><head>
          <script>var unrelated = 1;</script>
          <script>
            var thzq=['https://i1.example.com/001.jpg','https://i1.example.com/002.jpg',];
            var ytaw=['https://decoy.example.com/x.jpg'];
            $('#imgs').attr('data-src', thzq);
          </script>
        </head><body></body></html>
    "#;

    #[test]
    fn test_parse_manga_list_extracts_slug_title_cover() {
        let base = Url::parse("https://mangakatana.com/").unwrap();
        let mangas = parse_manga_list(SEARCH_HTML, &base);
        assert_eq!(mangas.len(), 2);
        assert_eq!(mangas[0].slug, "/manga/blue-lock.25032");
        assert_eq!(mangas[0].title, "Blue Lock");
        assert_eq!(
            mangas[0].cover.as_deref(),
            Some("https://mangakatana.com/imgs/blue.jpg")
        );
        assert_eq!(mangas[1].slug, "/manga/kaiju-no-8.24000");
        assert!(mangas[1].cover.is_none());
    }

    #[test]
    fn test_parse_heading() {
        assert_eq!(parse_heading(CHAPTERS_HTML).as_deref(), Some("Blue Lock"));
        assert!(parse_heading("<html></html>").is_none());
    }

    #[test]
    fn test_parse_chapter_rows_keeps_source_order_and_numbers() {
        let chapters = parse_chapter_rows(CHAPTERS_HTML);
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].id, "/manga/blue-lock.25032/c250.5");
        assert_eq!(chapters[0].slug, chapters[0].id);
        assert_eq!(chapters[0].number.as_deref(), Some("250.5"));
        assert_eq!(chapters[1].number.as_deref(), Some("250"));
        assert_eq!(chapters[2].title, "Oneshot");
        assert!(chapters[2].number.is_none());
    }

    #[test]
    fn test_parse_page_urls_follows_referenced_array() {
        let pages = parse_page_urls(READER_HTML);
        assert_eq!(
            pages,
            vec![
                "https://i1.example.com/001.jpg".to_string(),
                "https://i1.example.com/002.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_page_urls_without_script_is_empty() {
        assert!(parse_page_urls("<html><script>var a=[];</script></html>").is_empty());
    }

    #[test]
    fn test_extract_image_array_missing_declaration_is_empty() {
        assert!(extract_image_array("x('data-src', nothere);").is_empty());
    }
}
