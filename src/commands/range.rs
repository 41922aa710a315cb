//! Range editing and the chapter listing for the active manga.

use anyhow::{Context, Result, bail};
use manga_fetcher::session::{ChapterRow, RangeSelection, Session};

use crate::ProcessExit;
use crate::cli::RangeAction;

pub async fn run_range_command(session: &Session, action: &RangeAction) -> Result<ProcessExit> {
    let range = match *action {
        RangeAction::Start { index } => session.set_start(to_index(index)?)?,
        RangeAction::End { index } => session.set_end(to_index(index)?)?,
        RangeAction::Click { index } => {
            let index = to_index(index)?;
            session.set_chapter_index(index)?;
            session.click_advance(index)?
        }
        RangeAction::Clear => session.clear_range()?,
        RangeAction::Show => return show_chapters(session).await,
    };
    println!("Range: {}", describe_range(range));
    Ok(ProcessExit::Success)
}

async fn show_chapters(session: &Session) -> Result<ProcessExit> {
    if session.load_chapters().await?.is_none() {
        bail!("Selection changed while chapters were loading");
    }
    for row in session.chapter_rows() {
        println!("{}", render_chapter_row(&row));
    }
    match session.range_summary() {
        Some(summary) => println!("Selected: {summary}"),
        None => println!("No chapters."),
    }
    Ok(ProcessExit::Success)
}

fn to_index(index: u64) -> Result<usize> {
    usize::try_from(index).with_context(|| format!("Chapter index {index} is out of range"))
}

/// `start -> end`, with unset bounds shown as `first` and `last`.
pub(crate) fn describe_range(range: RangeSelection) -> String {
    let start = range
        .start
        .map_or_else(|| "first".to_string(), |index| index.to_string());
    let end = range
        .end
        .map_or_else(|| "last".to_string(), |index| index.to_string());
    format!("{start} -> {end}")
}

fn render_chapter_row(row: &ChapterRow) -> String {
    let downloaded = if row.downloaded { "✓" } else { " " };
    format!(
        "{} {downloaded} {:>5}  {}",
        row.position.marker(),
        row.index,
        row.chapter.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use manga_fetcher::session::ChapterPosition;
    use manga_fetcher::source::Chapter;

    #[test]
    fn test_describe_range_unset_bounds() {
        assert_eq!(describe_range(RangeSelection::default()), "first -> last");
        assert_eq!(describe_range(RangeSelection::new(Some(3), None)), "3 -> last");
        assert_eq!(describe_range(RangeSelection::new(Some(5), Some(2))), "5 -> 2");
    }

    #[test]
    fn test_render_chapter_row_markers() {
        let row = ChapterRow {
            index: 7,
            chapter: Chapter::new("7", "7", Some("7".to_string()), "Chapter 7"),
            position: ChapterPosition::Start,
            downloaded: true,
        };
        assert_eq!(render_chapter_row(&row), "[S] ✓     7  Chapter 7 (7)");
    }
}
