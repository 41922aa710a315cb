//! Error types for the session layer.

use std::path::PathBuf;

use thiserror::Error;

use super::tasks::TaskKind;
use crate::source::SourceError;

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested action does not apply to the current selection.
    #[error("{reason}")]
    InvalidSelection {
        /// User-facing explanation (e.g. "no manga selected").
        reason: String,
    },

    /// A task of the same kind is already running.
    #[error("a {kind} task is already running")]
    Busy {
        /// The kind of task that was rejected.
        kind: TaskKind,
    },

    /// The session file could not be written.
    #[error("failed to persist session to {path}: {reason}")]
    Persistence {
        /// Session file path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A source request failed while serving a session action.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl SessionError {
    /// Creates an invalid selection error.
    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        Self::InvalidSelection {
            reason: reason.into(),
        }
    }

    /// Creates a busy error.
    #[must_use]
    pub fn busy(kind: TaskKind) -> Self {
        Self::Busy { kind }
    }

    /// Creates a persistence error.
    pub fn persistence(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_manga_selected() -> Self {
        Self::invalid_selection("no manga selected")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selection_displays_reason_only() {
        let error = SessionError::invalid_selection("no chapters");
        assert_eq!(error.to_string(), "no chapters");
    }

    #[test]
    fn test_busy_names_task_kind() {
        let error = SessionError::busy(TaskKind::ChapterLoad);
        assert_eq!(error.to_string(), "a chapter load task is already running");
    }
}
