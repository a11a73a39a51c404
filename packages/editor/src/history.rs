//! # Undo/Redo History
//!
//! Snapshots of the sentence being edited, taken before each recorded edit.
//! A snapshot is a window of consecutive sentences: one for ordinary edits,
//! more once a sentence split or join has changed how many sentences the
//! edited text occupies.
//!
//! ## Design
//!
//! - Each edit pushes the window as it was before the edit
//! - Undo swaps the current sentence for the latest snapshot and keeps the
//!   current one for redo
//! - Redo does the reverse
//! - New edits clear the redo side
//! - Both sides are bounded; the oldest entry is evicted on overflow
//!
//! Snapshots are cheap: token arenas are persistent vectors, so a clone
//! shares structure with the live sentence.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new(200);
//! history.push(vec![sentence.clone()]);
//! sentence.set_field(TokenRef::Ordinary(1), &Field::Upos, "NOUN")?;
//!
//! let previous = history.undo(vec![sentence]).unwrap();
//! let redone = history.redo(previous).unwrap();
//! ```

use std::collections::VecDeque;
use treebank_conllu::Sentence;

pub const DEFAULT_CAPACITY: usize = 200;

/// Consecutive sentences, starting at the edited index
pub type Snapshot = Vec<Sentence>;

/// Bounded undo/redo stacks for the sentence being edited
#[derive(Debug, Clone)]
pub struct History {
    /// Snapshots before each edit (most recent last)
    past: VecDeque<Snapshot>,

    /// Sentences left by undo (most recent last)
    future: VecDeque<Snapshot>,

    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records the state before an edit
    pub fn push(&mut self, before: Snapshot) {
        push_bounded(&mut self.past, before, self.capacity);
        // A new edit invalidates the redo side.
        self.future.clear();
    }

    /// Returns the previous state, keeping `current` for redo
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.past.pop_back()?;
        push_bounded(&mut self.future, current, self.capacity);
        Some(previous)
    }

    /// Returns the state left by the last undo, keeping `current` for undo
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop_back()?;
        push_bounded(&mut self.past, current, self.capacity);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, capacity: usize) {
    stack.push_back(snapshot);
    while stack.len() > capacity {
        stack.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treebank_conllu::{parse_sentence, sentence_to_string, Field, TokenRef};

    fn text(snapshot: &Snapshot) -> String {
        snapshot.iter().map(sentence_to_string).collect()
    }

    fn sentence() -> Sentence {
        parse_sentence(
            "1\tLe\tle\tDET\t_\t_\t2\tdet\t_\t_\n\
             2\tchat\tchat\tNOUN\t_\t_\t0\troot\t_\t_\n",
        )
        .unwrap()
    }

    #[test]
    fn test_history_creation() {
        let history = History::default();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_and_redo_restore_states() {
        let mut current = sentence();
        let original = sentence_to_string(&current);
        let mut history = History::default();

        history.push(vec![current.clone()]);
        current
            .set_field(TokenRef::Ordinary(2), &Field::Upos, "PROPN")
            .unwrap();
        let edited = sentence_to_string(&current);

        let undone = history.undo(vec![current]).unwrap();
        assert_eq!(text(&undone), original);
        assert!(history.can_redo());

        let redone = history.redo(undone).unwrap();
        assert_eq!(text(&redone), edited);
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 0);

        let again = history.undo(redone).unwrap();
        assert_eq!(text(&again), original);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let current = sentence();
        let mut history = History::default();
        history.push(vec![current.clone()]);
        let previous = history.undo(vec![current]).unwrap();
        assert_eq!(history.redo_levels(), 1);

        history.push(previous);
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_capacity_enforced() {
        let current = sentence();
        let mut history = History::new(2);
        for _ in 0..3 {
            history.push(vec![current.clone()]);
        }
        assert_eq!(history.undo_levels(), 2);
        assert!(history.undo(vec![current.clone()]).is_some());
        assert!(history.undo(vec![current.clone()]).is_some());
        assert!(history.undo(vec![current]).is_none());
    }

    #[test]
    fn test_window_size_can_change() {
        let one = sentence();
        let mut history = History::default();
        history.push(vec![one.clone()]);
        let previous = history.undo(vec![one.clone(), one.clone()]).unwrap();
        assert_eq!(previous.len(), 1);
        let redone = history.redo(previous).unwrap();
        assert_eq!(redone.len(), 2);
    }
}
