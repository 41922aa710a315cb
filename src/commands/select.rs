//! Active manga selection.

use anyhow::Result;
use manga_fetcher::session::Session;
use manga_fetcher::source::{Manga, SourceId};
use tracing::debug;

use crate::ProcessExit;
use crate::cli::SelectArgs;
use crate::commands::range::describe_range;

pub async fn run_select_command(session: &Session, args: &SelectArgs) -> Result<ProcessExit> {
    select_manga(session, &args.source, &args.slug, args.title.as_deref()).await?;
    Ok(ProcessExit::Success)
}

/// Makes `slug` on `source` the active manga, fetching the title if needed.
pub(crate) async fn select_manga(
    session: &Session,
    source: &str,
    slug: &str,
    title: Option<&str>,
) -> Result<()> {
    let title = match title {
        Some(title) => title.to_string(),
        None => {
            let client = session.registry().require(source)?;
            let details = client.manga_details(slug).await?;
            debug!(slug, "Title fetched from source");
            details.title_or(slug)
        }
    };

    let range =
        session.select_manga(SourceId::new(source), Manga::new(slug, title.as_str(), None))?;
    println!("Selected {title} [{source}]");
    if !range.is_empty() {
        println!("Restored range: {}", describe_range(range));
    }
    Ok(())
}
