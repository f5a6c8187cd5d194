use std::collections::BTreeSet;

use crate::culling::{MarkRef, ScoreEntry};

/// Worst-to-best walk over a score list with per-candidate removal toggles.
///
/// The session never touches a track store; [`ReviewSession::mark_list`] is
/// applied by the caller once the review is committed.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    entries: Vec<ScoreEntry>,
    cursor: usize,
    marks: BTreeSet<MarkRef>,
}

impl ReviewSession {
    /// `entries` must already be ordered worst first.
    pub fn new(entries: Vec<ScoreEntry>) -> ReviewSession {
        ReviewSession {
            entries,
            cursor: 0,
            marks: BTreeSet::new(),
        }
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&ScoreEntry> {
        self.entries.get(self.cursor)
    }

    /// Advance; returns false at the end of the list.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn is_marked(&self, mark: &MarkRef) -> bool {
        self.marks.contains(mark)
    }

    pub fn mark(&mut self, mark: MarkRef) {
        self.marks.insert(mark);
    }

    pub fn unmark(&mut self, mark: &MarkRef) {
        self.marks.remove(mark);
    }

    /// Flip the current candidate; returns its new state.
    pub fn toggle_current(&mut self) -> Option<bool> {
        let mark = self.current()?.mark_ref();
        if self.marks.remove(&mark) {
            Some(false)
        } else {
            self.marks.insert(mark);
            Some(true)
        }
    }

    pub fn mark_count(&self) -> usize {
        self.marks.len()
    }

    pub fn mark_list(&self) -> Vec<MarkRef> {
        self.marks.iter().copied().collect()
    }
}
