//! Progress UI (per-chapter page bar) for range downloads.

use std::path::Path;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use manga_fetcher::download::{DownloadError, DownloadProgress};
use manga_fetcher::source::Chapter;

/// Renders one page bar per chapter on stderr.
///
/// When hidden, every event is still tracked so counts stay correct but
/// nothing is drawn.
pub(crate) struct ChapterProgressBar {
    bar: Mutex<Option<ProgressBar>>,
    visible: bool,
    position: Mutex<(usize, usize)>,
}

impl ChapterProgressBar {
    /// `total_chapters` is shown as `[n/total]` in each bar's prefix.
    pub(crate) fn new(visible: bool, total_chapters: usize) -> Self {
        Self {
            bar: Mutex::new(None),
            visible,
            position: Mutex::new((0, total_chapters)),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self
            .bar
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }

    fn advance(&self) -> (usize, usize) {
        let mut position = self
            .position
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        position.0 += 1;
        *position
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

impl DownloadProgress for ChapterProgressBar {
    fn chapter_started(&self, chapter: &Chapter, total_pages: usize) {
        let (current, total) = self.advance();
        let bar = ProgressBar::with_draw_target(
            Some(total_pages as u64),
            if self.visible {
                ProgressDrawTarget::stderr()
            } else {
                ProgressDrawTarget::hidden()
            },
        );
        bar.set_style(
            ProgressStyle::with_template("{prefix} {wide_msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(format!("[{current}/{total}]"));
        bar.set_message(chapter.label());
        if let Some(previous) = self
            .bar
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .replace(bar)
        {
            previous.finish_and_clear();
        }
    }

    fn page_completed(&self, _chapter: &Chapter, _index: usize, _skipped: bool) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn chapter_completed(&self, chapter: &Chapter, _location: &Path) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        if self.visible {
            eprintln!("  done  {}", chapter.label());
        }
    }

    fn chapter_failed(&self, chapter: &Chapter, error: &DownloadError) {
        match self.take_bar() {
            Some(bar) => bar.abandon(),
            // Failed before its page list was known; still counts as one.
            None => {
                self.advance();
            }
        }
        if self.visible {
            eprintln!("  FAIL  {}: {error}", chapter.label());
        }
    }
}
