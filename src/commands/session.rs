//! Theme preference and session inspection.

use anyhow::Result;
use manga_fetcher::session::Session;

use crate::ProcessExit;

pub fn run_theme_command(session: &Session, name: Option<&str>) -> Result<ProcessExit> {
    match name {
        Some(name) => {
            let mode = session.set_theme(name);
            println!("Theme: {name} ({mode})");
        }
        None => {
            let snapshot = session.snapshot();
            match snapshot.theme_name {
                Some(name) => println!("Theme: {name} ({})", snapshot.theme),
                None => println!("Theme: {}", snapshot.theme),
            }
        }
    }
    Ok(ProcessExit::Success)
}

pub fn run_session_command(session: &Session) -> Result<ProcessExit> {
    eprintln!("Session file: {}", session.store_path().display());
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(ProcessExit::Success)
}
