//! Chapter range selection for the active manga.
//!
//! Bounds are 1-based chapter positions and are stored exactly as entered.
//! Ordering and clamping happen only at resolution time, so a user can set
//! the end before the start, or pick bounds before the chapter list loads.

use serde::{Deserialize, Serialize};

use super::error::SessionError;
use crate::source::Chapter;

/// Optional start and end bounds; unset means "first" and "last".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSelection {
    /// 1-based start bound.
    pub start: Option<usize>,
    /// 1-based end bound.
    pub end: Option<usize>,
}

/// How a chapter position relates to the current range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterPosition {
    /// The start bound.
    Start,
    /// The end bound.
    End,
    /// Strictly between the bounds.
    InRange,
    /// Not selected.
    Outside,
}

impl ChapterPosition {
    /// Fixed-width marker used in chapter listings.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Start => "[S]",
            Self::End => "[E]",
            Self::InRange => "[*]",
            Self::Outside => "   ",
        }
    }
}

impl RangeSelection {
    /// Creates a selection with both bounds given.
    #[must_use]
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Records the start bound.
    pub fn set_start(&mut self, index: usize) {
        self.start = Some(index);
    }

    /// Records the end bound.
    pub fn set_end(&mut self, index: usize) {
        self.end = Some(index);
    }

    /// Applies a click on `index`: fills the start, then the end, then
    /// restarts with a new start.
    pub fn click_advance(&mut self, index: usize) {
        match (self.start, self.end) {
            (None, _) => self.start = Some(index),
            (Some(_), None) => self.end = Some(index),
            (Some(_), Some(_)) => {
                self.start = Some(index);
                self.end = None;
            }
        }
    }

    /// Unsets both bounds.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when neither bound is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Resolves the bounds against a list of `count` chapters.
    ///
    /// Unset bounds default to 1 and `count`, each bound is clamped into
    /// `[1, count]`, and inverted bounds are swapped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] when `count` is zero.
    pub fn resolve(&self, count: usize) -> Result<(usize, usize), SessionError> {
        if count == 0 {
            return Err(SessionError::invalid_selection("no chapters"));
        }
        let lo = self.start.unwrap_or(1).clamp(1, count);
        let hi = self.end.unwrap_or(count).clamp(1, count);
        Ok(if lo > hi { (hi, lo) } else { (lo, hi) })
    }

    /// Selected chapters, in list order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] when `chapters` is empty.
    pub fn select<'a>(&self, chapters: &'a [Chapter]) -> Result<&'a [Chapter], SessionError> {
        let (lo, hi) = self.resolve(chapters.len())?;
        Ok(&chapters[lo - 1..hi])
    }

    /// Classifies the 1-based `index` for display.
    ///
    /// The end marker wins when both bounds point at the same chapter, and
    /// in-range highlighting needs both bounds.
    #[must_use]
    pub fn position(&self, index: usize) -> ChapterPosition {
        if self.end == Some(index) {
            return ChapterPosition::End;
        }
        if self.start == Some(index) {
            return ChapterPosition::Start;
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            let (lo, hi) = if start > end { (end, start) } else { (start, end) };
            if (lo..=hi).contains(&index) {
                return ChapterPosition::InRange;
            }
        }
        ChapterPosition::Outside
    }

    /// One-line summary like `Chapter 1 -> Chapter 5`, just the title for a
    /// single chapter, or `None` when no chapters are loaded.
    #[must_use]
    pub fn summary(&self, chapters: &[Chapter]) -> Option<String> {
        let selected = self.select(chapters).ok()?;
        let first = selected.first()?;
        let last = selected.last()?;
        if selected.len() == 1 {
            return Some(first.title.clone());
        }
        Some(format!("{} -> {}", first.title, last.title))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn chapters(count: usize) -> Vec<Chapter> {
        (1..=count)
            .map(|i| Chapter::new(i.to_string(), format!("c{i}"), None, format!("Chapter {i}")))
            .collect()
    }

    #[test]
    fn test_resolve_defaults_to_full_range() {
        assert_eq!(RangeSelection::default().resolve(12).unwrap(), (1, 12));
    }

    #[test]
    fn test_resolve_swaps_inverted_bounds() {
        assert_eq!(RangeSelection::new(Some(9), Some(3)).resolve(12).unwrap(), (3, 9));
    }

    #[test]
    fn test_resolve_clamps_out_of_range_bounds() {
        assert_eq!(RangeSelection::new(Some(0), Some(50)).resolve(12).unwrap(), (1, 12));
        assert_eq!(RangeSelection::new(Some(40), None).resolve(12).unwrap(), (12, 12));
    }

    #[test]
    fn test_resolve_bounds_always_within_count() {
        for count in 1..6 {
            for start in [None, Some(0), Some(1), Some(3), Some(9)] {
                for end in [None, Some(0), Some(2), Some(5), Some(9)] {
                    let (lo, hi) = RangeSelection::new(start, end).resolve(count).unwrap();
                    assert!(1 <= lo && lo <= hi && hi <= count);
                }
            }
        }
    }

    #[test]
    fn test_resolve_zero_chapters_is_invalid() {
        let err = RangeSelection::default().resolve(0).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSelection { .. }));
    }

    #[test]
    fn test_click_advance_cycles_start_end_restart() {
        let mut range = RangeSelection::default();
        range.click_advance(4);
        assert_eq!(range, RangeSelection::new(Some(4), None));
        range.click_advance(2);
        assert_eq!(range, RangeSelection::new(Some(4), Some(2)));
        range.click_advance(7);
        assert_eq!(range, RangeSelection::new(Some(7), None));
    }

    #[test]
    fn test_click_advance_fills_start_when_only_end_set() {
        let mut range = RangeSelection::new(None, Some(5));
        range.click_advance(2);
        assert_eq!(range, RangeSelection::new(Some(2), Some(5)));
    }

    #[test]
    fn test_clear_unsets_both_bounds() {
        let mut range = RangeSelection::new(Some(1), Some(3));
        range.clear();
        assert!(range.is_empty());
    }

    #[test]
    fn test_select_returns_inclusive_slice() {
        let list = chapters(6);
        let range = RangeSelection::new(Some(5), Some(2));
        let selected = range.select(&list).unwrap();
        assert_eq!(selected.len(), 4);
        assert_eq!(selected[0].title, "Chapter 2");
        assert_eq!(selected[3].title, "Chapter 5");
    }

    #[test]
    fn test_position_markers() {
        let range = RangeSelection::new(Some(2), Some(4));
        assert_eq!(range.position(2), ChapterPosition::Start);
        assert_eq!(range.position(3), ChapterPosition::InRange);
        assert_eq!(range.position(4), ChapterPosition::End);
        assert_eq!(range.position(5), ChapterPosition::Outside);
        assert_eq!(range.position(3).marker(), "[*]");
    }

    #[test]
    fn test_position_end_wins_on_same_index() {
        let range = RangeSelection::new(Some(3), Some(3));
        assert_eq!(range.position(3), ChapterPosition::End);
    }

    #[test]
    fn test_position_single_bound_has_no_in_range() {
        let range = RangeSelection::new(Some(2), None);
        assert_eq!(range.position(3), ChapterPosition::Outside);
    }

    #[test]
    fn test_summary_names_first_and_last() {
        let list = chapters(5);
        let range = RangeSelection::new(Some(4), Some(2));
        assert_eq!(range.summary(&list).unwrap(), "Chapter 2 -> Chapter 4");
        assert!(range.summary(&[]).is_none());
    }

    #[test]
    fn test_summary_of_single_chapter_is_its_title() {
        let list = chapters(5);
        let range = RangeSelection::new(Some(3), Some(3));
        assert_eq!(range.summary(&list).unwrap(), "Chapter 3");
        assert_eq!(
            RangeSelection::default().summary(&list[..1]).unwrap(),
            "Chapter 1"
        );
    }
}
