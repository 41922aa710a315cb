//! In-memory source client and canned site payloads.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use manga_fetcher::source::{Chapter, Manga, MangaDetails, SourceClient, SourceError};
use reqwest::Client;
use serde_json::{Map, Value};
use tokio::sync::Notify;

/// Pauses a call until released; `entered` fires when the call arrives.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// Scriptable [`SourceClient`] for session and engine tests.
pub struct MockSource {
    name: String,
    http: Client,
    search_results: Vec<Manga>,
    search_status: Option<u16>,
    chapters: Vec<Chapter>,
    pages: HashMap<String, Vec<String>>,
    chapter_gate: Option<Gate>,
    search_gate: Option<Gate>,
    pub page_list_calls: AtomicUsize,
}

impl MockSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            http: Client::new(),
            search_results: Vec::new(),
            search_status: None,
            chapters: Vec::new(),
            pages: HashMap::new(),
            chapter_gate: None,
            search_gate: None,
            page_list_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_results(mut self, titles: &[&str]) -> Self {
        self.search_results = titles
            .iter()
            .map(|title| Manga::new(title.to_lowercase().replace(' ', "-"), *title, None))
            .collect();
        self
    }

    pub fn failing_search(mut self, status: u16) -> Self {
        self.search_status = Some(status);
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn with_pages(mut self, chapter_id: &str, pages: Vec<String>) -> Self {
        self.pages.insert(chapter_id.to_string(), pages);
        self
    }

    pub fn with_chapter_gate(mut self, gate: Gate) -> Self {
        self.chapter_gate = Some(gate);
        self
    }

    pub fn with_search_gate(mut self, gate: Gate) -> Self {
        self.search_gate = Some(gate);
        self
    }
}

#[async_trait]
impl SourceClient for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn http(&self) -> &Client {
        &self.http
    }

    async fn search(&self, _query: &str, _page: u32) -> Result<Vec<Manga>, SourceError> {
        if let Some(gate) = &self.search_gate {
            gate.pass().await;
        }
        match self.search_status {
            Some(status) => Err(SourceError::http_status(&self.name, "mock://search", status)),
            None => Ok(self.search_results.clone()),
        }
    }

    async fn manga_details(&self, slug: &str) -> Result<MangaDetails, SourceError> {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(format!("Title of {slug}")));
        Ok(MangaDetails::new(fields))
    }

    async fn chapters(&self, _slug: &str) -> Result<Vec<Chapter>, SourceError> {
        if let Some(gate) = &self.chapter_gate {
            gate.pass().await;
        }
        Ok(self.chapters.clone())
    }

    async fn chapter_pages(&self, chapter_id: &str) -> Result<Vec<String>, SourceError> {
        self.page_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.get(chapter_id).cloned().unwrap_or_default())
    }
}

/// Numbered chapters `1..=count` with ids `c{n}`.
pub fn numbered_chapters(count: usize) -> Vec<Chapter> {
    (1..=count)
        .map(|n| {
            Chapter::new(
                format!("c{n}"),
                format!("c{n}"),
                Some(n.to_string()),
                format!("Chapter {n}"),
            )
        })
        .collect()
}

/// Mangakatana search page listing `(href, title)` items.
pub fn katana_search_html(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(href, title)| {
            format!(
                r#"<div class="item"><div class="text"><h3><a href="{href}">{title}</a></h3></div></div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div id="book_list">{body}</div></body></html>"#)
}

/// Mangakatana manga page with a heading and `(href, label)` chapter rows.
pub fn katana_manga_html(title: &str, chapters: &[(&str, &str)]) -> String {
    let rows: String = chapters
        .iter()
        .map(|(href, label)| {
            format!(r#"<tr><td><div class="chapter"><a href="{href}">{label}</a></div></td></tr>"#)
        })
        .collect();
    format!(
        r#"<html><body><h1 class="heading">{title}</h1><table>{rows}</table></body></html>"#
    )
}

/// Mangakatana reader page whose inline script lists `pages`.
pub fn katana_reader_html(pages: &[String]) -> String {
    let quoted: Vec<String> = pages.iter().map(|page| format!("'{page}'")).collect();
    format!(
        "<html><head><script>var thzq=[{}];\n$('#imgs').attr('data-src', thzq);</script></head><body></body></html>",
        quoted.join(",")
    )
}
