//! Curriculum completion tracking.
//!
//! Unit convention: every chapter counts as one unit, and every section
//! counts as one more. A curriculum of one two-section chapter plus one
//! empty chapter therefore has four units, and completing the first
//! chapter with both its sections yields 75 %.
//!
//! Completion follows a strict linear order; see [`can_complete`].

use serde::Serialize;
use thiserror::Error;

use crate::models::{Chapter, Curriculum};

/// Position of one completable unit: a chapter, or a section within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnitRef {
    pub chapter: usize,
    pub section: Option<usize>,
}

impl UnitRef {
    pub fn chapter(chapter: usize) -> Self {
        Self { chapter, section: None }
    }

    pub fn section(chapter: usize, section: usize) -> Self {
        Self { chapter, section: Some(section) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("no such chapter or section")]
    OutOfRange,
    #[error("already completed")]
    AlreadyCompleted,
    #[error("previous chapters and sections must be completed first")]
    Locked,
}

pub fn total_units(curriculum: &Curriculum) -> usize {
    curriculum
        .chapters
        .iter()
        .map(|c| 1 + c.sections.len())
        .sum()
}

/// Completion percentage, rounded to the nearest integer and capped at 100.
/// A curriculum with no units reports 0.
pub fn percent(curriculum: &Curriculum, done: &[UnitRef]) -> u8 {
    let total = total_units(curriculum);
    if total == 0 {
        return 0;
    }
    let completed = done.iter().filter(|u| in_range(curriculum, **u)).count();
    let raw = (100.0 * completed as f64 / total as f64).round() as u8;
    raw.min(100)
}

fn in_range(curriculum: &Curriculum, unit: UnitRef) -> bool {
    match curriculum.chapters.get(unit.chapter) {
        None => false,
        Some(chapter) => match unit.section {
            None => true,
            Some(s) => s < chapter.sections.len(),
        },
    }
}

fn is_done(done: &[UnitRef], unit: UnitRef) -> bool {
    done.contains(&unit)
}

fn chapter_fully_done(chapter_index: usize, chapter: &Chapter, done: &[UnitRef]) -> bool {
    is_done(done, UnitRef::chapter(chapter_index))
        && (0..chapter.sections.len()).all(|s| is_done(done, UnitRef::section(chapter_index, s)))
}

/// Check whether a unit may be completed now.
///
/// The first chapter is always eligible. A later chapter requires the
/// previous chapter and all of its sections. A section requires the
/// previous section of the same chapter; the first section has no
/// prerequisite of its own.
pub fn can_complete(
    curriculum: &Curriculum,
    done: &[UnitRef],
    unit: UnitRef,
) -> Result<(), CompletionError> {
    if !in_range(curriculum, unit) {
        return Err(CompletionError::OutOfRange);
    }
    if is_done(done, unit) {
        return Err(CompletionError::AlreadyCompleted);
    }

    match unit.section {
        None => {
            if unit.chapter == 0 {
                return Ok(());
            }
            let prev_index = unit.chapter - 1;
            let prev = &curriculum.chapters[prev_index];
            if chapter_fully_done(prev_index, prev, done) {
                Ok(())
            } else {
                Err(CompletionError::Locked)
            }
        }
        Some(0) => Ok(()),
        Some(s) => {
            if is_done(done, UnitRef::section(unit.chapter, s - 1)) {
                Ok(())
            } else {
                Err(CompletionError::Locked)
            }
        }
    }
}

/// Legacy display title for a unit: the chapter title, or
/// `"<chapter> - <section>"`. Only valid for in-range units.
pub fn display_title(curriculum: &Curriculum, unit: UnitRef) -> Option<String> {
    let chapter = curriculum.chapters.get(unit.chapter)?;
    match unit.section {
        None => Some(chapter.title.clone()),
        Some(s) => {
            let section = chapter.sections.get(s)?;
            Some(format!("{} - {}", chapter.title, section))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curriculum() -> Curriculum {
        Curriculum {
            chapters: vec![
                Chapter {
                    title: "Ch1".to_string(),
                    sections: vec!["S1".to_string(), "S2".to_string()],
                },
                Chapter {
                    title: "Ch2".to_string(),
                    sections: vec![],
                },
            ],
        }
    }

    #[test]
    fn empty_progress_is_zero_percent() {
        assert_eq!(percent(&curriculum(), &[]), 0);
    }

    #[test]
    fn three_of_four_units_is_seventy_five() {
        let done = [
            UnitRef::chapter(0),
            UnitRef::section(0, 0),
            UnitRef::section(0, 1),
        ];
        assert_eq!(percent(&curriculum(), &done), 75);
    }

    #[test]
    fn all_units_is_one_hundred() {
        let done = [
            UnitRef::chapter(0),
            UnitRef::section(0, 0),
            UnitRef::section(0, 1),
            UnitRef::chapter(1),
        ];
        assert_eq!(percent(&curriculum(), &done), 100);
    }

    #[test]
    fn empty_curriculum_is_zero_percent() {
        assert_eq!(percent(&Curriculum::default(), &[]), 0);
    }

    #[test]
    fn out_of_range_entries_do_not_count() {
        let done = [UnitRef::chapter(7), UnitRef::section(0, 9)];
        assert_eq!(percent(&curriculum(), &done), 0);
    }

    #[test]
    fn first_chapter_is_always_eligible() {
        assert_eq!(can_complete(&curriculum(), &[], UnitRef::chapter(0)), Ok(()));
    }

    #[test]
    fn first_section_is_eligible_without_prerequisites() {
        assert_eq!(can_complete(&curriculum(), &[], UnitRef::section(0, 0)), Ok(()));
    }

    #[test]
    fn skipping_a_chapter_is_locked() {
        assert_eq!(
            can_complete(&curriculum(), &[], UnitRef::chapter(1)),
            Err(CompletionError::Locked)
        );
        // Chapter alone is not enough; its sections gate the next chapter.
        assert_eq!(
            can_complete(&curriculum(), &[UnitRef::chapter(0)], UnitRef::chapter(1)),
            Err(CompletionError::Locked)
        );
    }

    #[test]
    fn next_chapter_unlocks_after_full_previous_chapter() {
        let done = [
            UnitRef::chapter(0),
            UnitRef::section(0, 0),
            UnitRef::section(0, 1),
        ];
        assert_eq!(can_complete(&curriculum(), &done, UnitRef::chapter(1)), Ok(()));
    }

    #[test]
    fn skipping_a_section_is_locked() {
        assert_eq!(
            can_complete(&curriculum(), &[], UnitRef::section(0, 1)),
            Err(CompletionError::Locked)
        );
        assert_eq!(
            can_complete(&curriculum(), &[UnitRef::section(0, 0)], UnitRef::section(0, 1)),
            Ok(())
        );
    }

    #[test]
    fn completing_twice_is_rejected() {
        let done = [UnitRef::chapter(0)];
        assert_eq!(
            can_complete(&curriculum(), &done, UnitRef::chapter(0)),
            Err(CompletionError::AlreadyCompleted)
        );
    }

    #[test]
    fn unknown_indices_are_rejected() {
        assert_eq!(
            can_complete(&curriculum(), &[], UnitRef::chapter(5)),
            Err(CompletionError::OutOfRange)
        );
        assert_eq!(
            can_complete(&curriculum(), &[], UnitRef::section(1, 0)),
            Err(CompletionError::OutOfRange)
        );
    }

    #[test]
    fn display_titles_use_the_legacy_join() {
        let c = curriculum();
        assert_eq!(display_title(&c, UnitRef::chapter(0)).as_deref(), Some("Ch1"));
        assert_eq!(
            display_title(&c, UnitRef::section(0, 1)).as_deref(),
            Some("Ch1 - S2")
        );
        assert_eq!(display_title(&c, UnitRef::section(1, 0)), None);
    }
}
