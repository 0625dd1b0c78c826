//! Position re-projection
//!
//! The shift arithmetic used for formatting spans, exposed for anything
//! else that anchors to a character offset: cursors, selections, comment
//! and suggestion anchors. Using these functions keeps those anchors in
//! step with the document's own span bookkeeping.

use crate::{Operation, OperationKind};
use serde::{Deserialize, Serialize};

/// Which way an anchor sitting exactly on an insert point moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    /// Stay before the inserted text
    Left,
    /// Move after the inserted text
    Right,
}

/// Re-project a character offset through an applied operation.
///
/// - Insert at `p` of `n` chars: offsets after `p` move by `n`; an offset
///   equal to `p` moves only with [`Bias::Right`].
/// - Delete of `[p, p+n)`: offsets inside collapse to `p`, offsets after
///   move back by `n`.
/// - Retain / Format: unchanged.
pub fn transform_index(index: usize, op: &Operation, bias: Bias) -> usize {
    match &op.kind {
        OperationKind::Insert { .. } => {
            let moves = index > op.position || (index == op.position && bias == Bias::Right);
            if moves {
                index.saturating_add(op.len())
            } else {
                index
            }
        }
        OperationKind::Delete { length } => {
            if index <= op.position {
                index
            } else if index >= op.position.saturating_add(*length) {
                index - length
            } else {
                op.position
            }
        }
        OperationKind::Retain { .. } | OperationKind::Format { .. } => index,
    }
}

/// Re-project a `[start, end)` range. The start sticks right and the end
/// sticks left, so text inserted at either boundary stays outside the range.
pub fn transform_range(start: usize, end: usize, op: &Operation) -> (usize, usize) {
    let new_start = transform_index(start, op, Bias::Right);
    let new_end = transform_index(end, op, Bias::Left);
    (new_start, new_end.max(new_start))
}

/// A user's selection, kept in step with remote edits.
///
/// `anchor` is where the selection was started and `head` is where the caret
/// sits, so a backwards selection has `head < anchor`. Equal ends are a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSelection {
    pub anchor: usize,
    pub head: usize,
}

impl TextSelection {
    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn is_caret(&self) -> bool {
        self.anchor == self.head
    }

    /// Covered `[start, end)` regardless of direction
    pub fn bounds(&self) -> (usize, usize) {
        (self.anchor.min(self.head), self.anchor.max(self.head))
    }

    /// Follow a remote operation. A caret moves with `bias`; a range keeps
    /// remote inserts at its edges outside and preserves its direction.
    pub fn transform(&self, op: &Operation, bias: Bias) -> Self {
        if self.is_caret() {
            return Self::caret(transform_index(self.head, op, bias));
        }

        let (start, end) = self.bounds();
        let (start, end) = transform_range(start, end, op);
        if self.anchor <= self.head {
            Self::new(start, end)
        } else {
            Self::new(end, start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_through_insert() {
        let op = Operation::insert("a", 3, "xy");
        assert_eq!(transform_index(2, &op, Bias::Right), 2);
        assert_eq!(transform_index(3, &op, Bias::Left), 3);
        assert_eq!(transform_index(3, &op, Bias::Right), 5);
        assert_eq!(transform_index(7, &op, Bias::Left), 9);
    }

    #[test]
    fn test_index_through_delete() {
        let op = Operation::delete("a", 2, 4);
        assert_eq!(transform_index(1, &op, Bias::Left), 1);
        assert_eq!(transform_index(2, &op, Bias::Left), 2);
        assert_eq!(transform_index(4, &op, Bias::Right), 2);
        assert_eq!(transform_index(6, &op, Bias::Left), 2);
        assert_eq!(transform_index(9, &op, Bias::Left), 5);
    }

    #[test]
    fn test_range_edges_exclude_insert() {
        let op = Operation::insert("a", 5, "zzz");
        assert_eq!(transform_range(5, 8, &op), (8, 11));
        assert_eq!(transform_range(2, 5, &op), (2, 5));
        assert_eq!(transform_range(2, 8, &op), (2, 11));
    }

    #[test]
    fn test_range_clipped_by_delete() {
        let op = Operation::delete("a", 4, 10);
        assert_eq!(transform_range(2, 6, &op), (2, 4));
        assert_eq!(transform_range(5, 8, &op), (4, 4));
        assert_eq!(transform_range(12, 20, &op), (4, 10));
    }

    #[test]
    fn test_selection_follows_remote_edits() {
        let backwards = TextSelection::new(8, 4);
        let moved = backwards.transform(&Operation::insert("b", 0, "ab"), Bias::Left);
        assert_eq!(moved, TextSelection::new(10, 6));
        assert_eq!(moved.bounds(), (6, 10));

        let caret = TextSelection::caret(6);
        let moved = caret.transform(&Operation::delete("b", 2, 10), Bias::Left);
        assert_eq!(moved, TextSelection::caret(2));
        assert!(moved.is_caret());
    }

    #[test]
    fn test_selection_swallowed_by_delete_becomes_caret() {
        let sel = TextSelection::new(3, 6);
        let moved = sel.transform(&Operation::delete("b", 2, 5), Bias::Right);
        assert_eq!(moved, TextSelection::caret(2));

        // Insert at the range edge stays outside
        let sel = TextSelection::new(3, 6);
        let moved = sel.transform(&Operation::insert("b", 6, "zz"), Bias::Right);
        assert_eq!(moved.bounds(), (3, 6));
    }
}
