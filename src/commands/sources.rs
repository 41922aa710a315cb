//! Source listing and activation.

use anyhow::Result;
use manga_fetcher::session::Session;
use manga_fetcher::source::SourceId;

use crate::ProcessExit;

pub fn run_sources_command(session: &Session) -> Result<ProcessExit> {
    let active = session.active_sources();
    for source in session.available_sources() {
        let marker = if active.contains(&source) { "*" } else { " " };
        println!("{marker} {source}");
    }
    Ok(ProcessExit::Success)
}

pub fn run_toggle_command(session: &Session, source: &str) -> Result<ProcessExit> {
    let active = session.toggle_source(&SourceId::new(source))?;
    let names: Vec<&str> = active.iter().map(SourceId::as_str).collect();
    println!("Active sources: {}", names.join(", "));
    Ok(ProcessExit::Success)
}
