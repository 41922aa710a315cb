//! Search and listing commands.

use anyhow::Result;
use manga_fetcher::session::{ResultEntry, Session};
use manga_fetcher::source::{KissLoveClient, Manga, SourceClient};

use crate::ProcessExit;
use crate::cli::SearchArgs;

pub async fn run_search_command(session: &Session, args: &SearchArgs) -> Result<ProcessExit> {
    let query = args.query.join(" ");
    let results = session.search(&query, args.page).await?;
    if results.is_empty() {
        println!("No results for '{query}'.");
        return Ok(ProcessExit::Success);
    }
    for row in render_result_rows(&results) {
        println!("{row}");
    }
    Ok(ProcessExit::Success)
}

pub async fn run_latest_command(
    client: &KissLoveClient,
    page: u32,
    limit: Option<u32>,
) -> Result<ProcessExit> {
    print_listing(client.name(), &client.latest(page, limit).await?);
    Ok(ProcessExit::Success)
}

pub async fn run_trending_command(client: &KissLoveClient) -> Result<ProcessExit> {
    print_listing(client.name(), &client.trending().await?);
    Ok(ProcessExit::Success)
}

fn print_listing(source: &str, mangas: &[Manga]) {
    if mangas.is_empty() {
        println!("Nothing listed.");
    }
    for manga in mangas {
        println!("{source}\t{}\t{}", manga.slug, manga.title);
    }
}

/// One tab-separated `source, slug, title` row per result.
pub(crate) fn render_result_rows(results: &[ResultEntry]) -> Vec<String> {
    results
        .iter()
        .map(|entry| format!("{}\t{}\t{}", entry.source, entry.manga.slug, entry.manga.title))
        .collect()
}
