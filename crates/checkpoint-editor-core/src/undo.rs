//! Undo/redo history of whole-draft snapshots.
//!
//! Every mutating entry point records the draft as it was *before* the
//! change. Undo and redo swap the current draft with the top of the
//! opposite stack, so the stacks never depend on remote state.

use std::collections::VecDeque;

use crate::model::Draft;

/// Default maximum number of undo steps kept.
pub const DEFAULT_MAX_UNDO_STEPS: usize = 100;

/// Two bounded stacks of draft snapshots with linear-history discipline.
#[derive(Debug, Clone)]
pub struct UndoStack {
    undo_stack: VecDeque<Draft>,
    redo_stack: Vec<Draft>,
    max_steps: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_STEPS)
    }
}

impl UndoStack {
    /// Create an empty history keeping at most `max_steps` undo entries.
    ///
    /// A limit of zero is raised to one so that the latest change can
    /// always be undone.
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
        }
    }

    /// Snapshot `current` before a mutation. Clears the redo stack.
    pub fn record(&mut self, current: &Draft) {
        self.redo_stack.clear();
        self.undo_stack.push_back(current.clone());

        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.pop_front();
        }
    }

    /// Pop the previous draft, pushing `current` onto the redo stack.
    ///
    /// Returns `None` (and changes nothing) when there is nothing to undo.
    pub fn undo(&mut self, current: &Draft) -> Option<Draft> {
        let prev = self.undo_stack.pop_back()?;
        self.redo_stack.push(current.clone());
        Some(prev)
    }

    /// Mirror of [`UndoStack::undo`].
    pub fn redo(&mut self, current: &Draft) -> Option<Draft> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current.clone());
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.pop_front();
        }
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;

    use super::*;
    use crate::model::Step;

    fn draft(title: &str) -> Draft {
        Draft::new(title, vec![Step::new(title)])
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = UndoStack::default();
        let a = draft("a");
        let b = draft("b");

        assert!(!history.can_undo());
        history.record(&a);
        assert!(history.can_undo());

        assert_eq!(history.undo(&b), Some(a.clone()));
        assert!(!history.can_undo());
        assert!(history.can_redo());

        assert_eq!(history.redo(&a), Some(b));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = UndoStack::default();
        let current = draft("x");
        assert_eq!(history.undo(&current), None);
        assert_eq!(history.redo(&current), None);
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_new_record_clears_redo() {
        let mut history = UndoStack::default();
        history.record(&draft("a"));
        history.undo(&draft("b"));
        assert!(history.can_redo());

        history.record(&draft("a"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_max_steps_evicts_oldest() {
        let mut history = UndoStack::new(3);
        for title in ["a", "b", "c", "d"] {
            history.record(&draft(title));
        }
        assert_eq!(history.undo_depth(), 3);

        let current = draft("e");
        assert_eq!(history.undo(&current).unwrap().title, "d");
        assert_eq!(history.undo(&current).unwrap().title, "c");
        assert_eq!(history.undo(&current).unwrap().title, "b");
        assert_eq!(history.undo(&current), None);
    }

    #[test]
    fn test_zero_limit_still_keeps_one() {
        let history = UndoStack::new(0);
        assert_eq!(history.max_steps(), 1);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_mutation() {
        let mut history = UndoStack::default();
        let mut current = draft("a");
        history.record(&current);
        current.checkpoints[0].completed = true;
        current.title.push('!');

        let restored = history.undo(&current).unwrap();
        assert_eq!(restored, draft("a"));
    }

    quickcheck! {
        // Undoing every recorded change walks back through each prior state,
        // and redoing the same number of times lands on the final state.
        fn prop_undo_redo_inverse(titles: Vec<String>) -> bool {
            let mut history = UndoStack::new(titles.len() + 1);
            let mut states = vec![Draft::default()];
            let mut current = Draft::default();
            for title in &titles {
                history.record(&current);
                current = Draft::new(title.clone(), vec![Step::new(title.clone())]);
                states.push(current.clone());
            }

            for expected in states.iter().rev().skip(1) {
                match history.undo(&current) {
                    Some(prev) if &prev == expected => current = prev,
                    _ => return false,
                }
            }
            if history.undo(&current).is_some() {
                return false;
            }

            for expected in states.iter().skip(1) {
                match history.redo(&current) {
                    Some(next) if &next == expected => current = next,
                    _ => return false,
                }
            }
            current == *states.last().unwrap()
        }
    }
}
