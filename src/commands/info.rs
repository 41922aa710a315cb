//! Manga details and chapter listing without touching the session.

use anyhow::Result;
use manga_fetcher::source::{MangaDetails, SourceRegistry};
use serde_json::Value;

use crate::ProcessExit;
use crate::cli::InfoArgs;

pub async fn run_info_command(registry: &SourceRegistry, args: &InfoArgs) -> Result<ProcessExit> {
    let client = registry.require(&args.source)?;
    let details = client.manga_details(&args.slug).await?;
    let chapters = client.chapters(&args.slug).await?;

    println!("{}", details.title_or(&args.slug));
    for line in render_detail_lines(&details) {
        println!("  {line}");
    }
    println!("{} chapter(s)", chapters.len());
    for (offset, chapter) in chapters.iter().enumerate() {
        println!("{:>5}  {}", offset + 1, chapter.label());
    }
    Ok(ProcessExit::Success)
}

/// Scalar detail fields as `key: value`; nested values are left out.
fn render_detail_lines(details: &MangaDetails) -> Vec<String> {
    details
        .fields()
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(text) if !text.trim().is_empty() => text.trim().to_string(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => return None,
            };
            Some(format!("{key}: {text}"))
        })
        .collect()
}
