//! Range download for the active manga, optionally selecting it first.

use anyhow::{Context, Result, bail};
use manga_fetcher::download::RangeDownloadSummary;
use manga_fetcher::session::Session;
use tracing::info;

use crate::ProcessExit;
use crate::app::exit_handler::determine_exit_outcome;
use crate::app::progress_manager::ChapterProgressBar;
use crate::cli::DownloadArgs;
use crate::commands::select::select_manga;

pub async fn run_download_command(
    session: &Session,
    args: &DownloadArgs,
    show_progress: bool,
) -> Result<ProcessExit> {
    if let Some(slug) = &args.slug {
        let source = args
            .source
            .as_deref()
            .context("--source is required together with a slug")?;
        select_manga(session, source, slug, args.title.as_deref()).await?;
    }
    if let Some(start) = args.start {
        session.set_start(usize::try_from(start).context("Range start is out of range")?)?;
    }
    if let Some(end) = args.end {
        session.set_end(usize::try_from(end).context("Range end is out of range")?)?;
    }

    if session.load_chapters().await?.is_none() {
        bail!("Selection changed while chapters were loading");
    }
    let (start, end) = session.resolve_selection()?;
    if let Some(summary) = session.range_summary() {
        println!("Downloading {summary}");
    }
    info!(start, end, output = %session.output_root().display(), "Range resolved");

    let progress = ChapterProgressBar::new(show_progress, session.selected_chapters()?.len());
    let summary = session.download_selection(&progress).await?;
    print_summary(&summary);

    Ok(determine_exit_outcome(
        summary.completed.len(),
        summary.failed.len(),
    ))
}

fn print_summary(summary: &RangeDownloadSummary) {
    for failed in &summary.failed {
        println!("Failed: {} ({})", failed.chapter.label(), failed.error);
    }
    println!(
        "{} of {} chapter(s) downloaded",
        summary.completed.len(),
        summary.total()
    );
}
