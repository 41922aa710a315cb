//! Shared User-Agent string for source HTTP clients.
//!
//! Both sites reject obvious tool traffic, so every client presents the same
//! desktop browser identity.

/// Browser User-Agent sent with every source and page request.
pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64) Gecko/20100101 Firefox/121.0";

/// Returns the User-Agent used by source clients.
#[must_use]
pub(crate) fn default_source_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}
