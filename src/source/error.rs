//! Error types for source client operations.
//!
//! Every variant names the source that failed so aggregation logs stay
//! attributable when several sources are queried together.

use thiserror::Error;

/// Errors that can occur while talking to a manga source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level failure (DNS, connect, TLS, timeout).
    #[error("{source_name} unavailable: request to {url} failed: {source}")]
    Unavailable {
        /// Source identity that failed.
        source_name: String,
        /// Request URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The source answered with a non-success HTTP status.
    #[error("{source_name} returned HTTP {status} for {url}")]
    HttpStatus {
        /// Source identity that failed.
        source_name: String,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The payload did not match the expected shape.
    #[error("{source_name} returned an unexpected payload from {url}: {reason}")]
    Parse {
        /// Source identity that failed.
        source_name: String,
        /// Request URL.
        url: String,
        /// What did not match.
        reason: String,
    },

    /// No client is registered under the requested identity.
    #[error("unknown source '{name}' (available: {available})")]
    UnknownSource {
        /// Requested identity.
        name: String,
        /// Comma-separated registered identities.
        available: String,
    },

    /// The HTTP client for a source could not be constructed.
    #[error("failed to build HTTP client for {source_name}: {reason}")]
    ClientBuild {
        /// Source identity.
        source_name: String,
        /// Why construction failed.
        reason: String,
    },
}

impl SourceError {
    /// Creates an `Unavailable` error from a reqwest error.
    pub fn unavailable(source_name: &str, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Unavailable {
            source_name: source_name.to_string(),
            url: url.into(),
            source,
        }
    }

    /// Creates an `HttpStatus` error.
    pub fn http_status(source_name: &str, url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            source_name: source_name.to_string(),
            url: url.into(),
            status,
        }
    }

    /// Creates a `Parse` error.
    pub fn parse(source_name: &str, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.to_string(),
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `UnknownSource` error listing the registered identities.
    pub fn unknown_source(name: &str, available: &[&str]) -> Self {
        Self::UnknownSource {
            name: name.to_string(),
            available: available.join(", "),
        }
    }

    /// Creates a `ClientBuild` error.
    pub fn client_build(source_name: &str, reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for payload-shape failures.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Returns true for network and HTTP status failures.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::HttpStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_names_source_and_status() {
        let error = SourceError::http_status("kisslove", "https://klz9.com/api/manga/list", 503);
        let msg = error.to_string();
        assert!(msg.contains("kisslove"), "Expected source in: {msg}");
        assert!(msg.contains("503"), "Expected status in: {msg}");
        assert!(error.is_unavailable());
        assert!(!error.is_parse_failure());
    }

    #[test]
    fn test_parse_display_includes_reason() {
        let error = SourceError::parse("mangakatana", "https://mangakatana.com/x", "no chapters");
        assert!(error.to_string().contains("no chapters"));
        assert!(error.is_parse_failure());
    }

    #[test]
    fn test_unknown_source_lists_available() {
        let error = SourceError::unknown_source("nope", &["kisslove", "mangakatana"]);
        let msg = error.to_string();
        assert!(msg.contains("'nope'"));
        assert!(msg.contains("kisslove, mangakatana"));
    }
}
