//! Change summaries between two versions of a document
//!
//! Deleted text is not kept in the operation log, so removals are reported
//! by length only. Likewise the attributes a range had before a format
//! operation are not recorded, so `old_attributes` is always `None`.

use crate::{DocumentState, Operation, OperationKind, TextAttributes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text added or removed by one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChange {
    /// Operation that made the change
    pub operation_id: Uuid,
    /// Author
    pub user_id: String,
    /// Position at the time the operation was applied
    pub position: usize,
    /// Inserted text, or a placeholder for removals
    pub text: String,
    /// Characters affected
    pub length: usize,
    /// When the edit was made
    pub timestamp: DateTime<Utc>,
}

/// A formatting change made by one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatChange {
    /// Operation that made the change
    pub operation_id: Uuid,
    /// Author
    pub user_id: String,
    /// Start of the formatted range
    pub position: usize,
    /// Characters formatted
    pub length: usize,
    /// Previous attributes (not tracked)
    pub old_attributes: Option<TextAttributes>,
    /// Attributes applied
    pub new_attributes: TextAttributes,
}

/// Changes between two versions of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiff {
    /// Version of the older state
    pub from_version: u64,
    /// Version of the newer state
    pub to_version: u64,
    /// Inserted text
    pub added_text: Vec<TextChange>,
    /// Removed text (placeholders)
    pub removed_text: Vec<TextChange>,
    /// Formatting changes
    pub modified_formatting: Vec<FormatChange>,
}

impl VersionDiff {
    /// True if nothing changed
    pub fn is_empty(&self) -> bool {
        self.added_text.is_empty()
            && self.removed_text.is_empty()
            && self.modified_formatting.is_empty()
    }

    /// Total characters inserted
    pub fn chars_added(&self) -> usize {
        self.added_text.iter().map(|c| c.length).sum()
    }

    /// Total characters removed
    pub fn chars_removed(&self) -> usize {
        self.removed_text.iter().map(|c| c.length).sum()
    }
}

/// Placeholder text for a removal of `length` characters
pub fn removal_placeholder(length: usize) -> String {
    match length {
        1 => "[1 character removed]".to_string(),
        n => format!("[{} characters removed]", n),
    }
}

/// Summarize the operations `new` has beyond `old`.
///
/// Never fails: if `new` does not extend `old`, the diff is empty.
pub fn calculate_diff(old: &DocumentState, new: &DocumentState) -> VersionDiff {
    let mut diff = VersionDiff {
        from_version: old.version,
        to_version: new.version,
        ..Default::default()
    };

    let Some(ops) = new.operations.get(old.operations.len()..) else {
        return diff;
    };

    for op in ops.iter().filter(|op| !op.is_noop()) {
        match &op.kind {
            OperationKind::Insert { content, .. } => {
                diff.added_text.push(text_change(op, content.clone()));
            }
            OperationKind::Delete { length } => {
                diff.removed_text
                    .push(text_change(op, removal_placeholder(*length)));
            }
            OperationKind::Retain {
                attributes: Some(attrs),
                length,
            }
            | OperationKind::Format {
                attributes: attrs,
                length,
            } => diff.modified_formatting.push(FormatChange {
                operation_id: op.id,
                user_id: op.user_id.clone(),
                position: op.position,
                length: *length,
                old_attributes: None,
                new_attributes: attrs.clone(),
            }),
            OperationKind::Retain {
                attributes: None, ..
            } => {}
        }
    }

    diff
}

fn text_change(op: &Operation, text: String) -> TextChange {
    TextChange {
        operation_id: op.id,
        user_id: op.user_id.clone(),
        position: op.position,
        text,
        length: op.len(),
        timestamp: op.timestamp,
    }
}
