//! At most one in-flight task per kind.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::error::SessionError;

/// Kinds of background work the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Aggregated search across active sources.
    Search,
    /// Chapter list fetch for the active manga.
    ChapterLoad,
    /// Batch download of the selected range.
    RangeDownload,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Search => "search",
            Self::ChapterLoad => "chapter load",
            Self::RangeDownload => "range download",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
pub(crate) struct TaskGuards {
    search: AtomicBool,
    chapter_load: AtomicBool,
    range_download: AtomicBool,
}

impl TaskGuards {
    fn slot(&self, kind: TaskKind) -> &AtomicBool {
        match kind {
            TaskKind::Search => &self.search,
            TaskKind::ChapterLoad => &self.chapter_load,
            TaskKind::RangeDownload => &self.range_download,
        }
    }

    /// Claims the slot for `kind`, or fails with [`SessionError::Busy`].
    pub(crate) fn try_start(&self, kind: TaskKind) -> Result<TaskPermit<'_>, SessionError> {
        let slot = self.slot(kind);
        if slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%kind, "Task rejected, already running");
            return Err(SessionError::busy(kind));
        }
        Ok(TaskPermit { slot })
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self, kind: TaskKind) -> bool {
        self.slot(kind).load(Ordering::Acquire)
    }
}

/// Releases its task slot on drop.
#[derive(Debug)]
pub(crate) struct TaskPermit<'a> {
    slot: &'a AtomicBool,
}

impl Drop for TaskPermit<'_> {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}
