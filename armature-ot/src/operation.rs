//! Edit operations
//!
//! An [`Operation`] is an immutable edit intent at a position in a document.
//! Positions and lengths count Unicode scalar values, not bytes.

use crate::{TextAttributes, TransformError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Variant-specific payload of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationKind {
    /// Insert text at the position
    Insert {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<TextAttributes>,
    },
    /// Remove `length` characters starting at the position
    Delete { length: usize },
    /// Walk over `length` characters, optionally applying attributes
    Retain {
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<TextAttributes>,
    },
    /// Apply attributes to `length` characters
    Format {
        length: usize,
        attributes: TextAttributes,
    },
}

/// A single edit operation
///
/// On the wire an operation is one flat record tagged by `type`:
///
/// ```json
/// {"id":"…","userId":"alice","timestamp":"2024-01-01T00:00:00Z",
///  "position":6,"type":"insert","content":"there "}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique operation ID, kept across transforms
    pub id: Uuid,
    /// User that produced the edit
    pub user_id: String,
    /// Wall-clock time of the edit
    pub timestamp: DateTime<Utc>,
    /// 0-based character offset into the document
    pub position: usize,
    /// What the operation does
    #[serde(flatten)]
    pub kind: OperationKind,
}

impl Operation {
    fn new(user_id: impl Into<String>, position: usize, kind: OperationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            timestamp: Utc::now(),
            position,
            kind,
        }
    }

    /// Create an insert operation
    pub fn insert(user_id: impl Into<String>, position: usize, content: impl Into<String>) -> Self {
        Self::new(
            user_id,
            position,
            OperationKind::Insert {
                content: content.into(),
                attributes: None,
            },
        )
    }

    /// Create a delete operation
    pub fn delete(user_id: impl Into<String>, position: usize, length: usize) -> Self {
        Self::new(user_id, position, OperationKind::Delete { length })
    }

    /// Create a retain operation without attributes
    pub fn retain(user_id: impl Into<String>, position: usize, length: usize) -> Self {
        Self::new(
            user_id,
            position,
            OperationKind::Retain {
                length,
                attributes: None,
            },
        )
    }

    /// Create a format operation
    pub fn format(
        user_id: impl Into<String>,
        position: usize,
        length: usize,
        attributes: TextAttributes,
    ) -> Self {
        Self::new(
            user_id,
            position,
            OperationKind::Format { length, attributes },
        )
    }

    /// Attach attributes (insert, retain and format only; ignored for delete)
    pub fn with_attributes(mut self, attrs: TextAttributes) -> Self {
        match &mut self.kind {
            OperationKind::Insert { attributes, .. } | OperationKind::Retain { attributes, .. } => {
                *attributes = Some(attrs);
            }
            OperationKind::Format { attributes, .. } => *attributes = attrs,
            OperationKind::Delete { .. } => {}
        }
        self
    }

    /// Override the timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Override the ID
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub(crate) fn at(&self, position: usize) -> Self {
        let mut op = self.clone();
        op.position = position;
        op
    }

    /// Copy with a new length; inserts keep their content
    pub(crate) fn with_length(&self, position: usize, new_length: usize) -> Self {
        let mut op = self.at(position);
        match &mut op.kind {
            OperationKind::Delete { length }
            | OperationKind::Retain { length, .. }
            | OperationKind::Format { length, .. } => *length = new_length,
            OperationKind::Insert { .. } => {}
        }
        op
    }

    /// Lowercase variant name
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            OperationKind::Insert { .. } => "insert",
            OperationKind::Delete { .. } => "delete",
            OperationKind::Retain { .. } => "retain",
            OperationKind::Format { .. } => "format",
        }
    }

    /// Number of characters the operation covers (inserted text for inserts)
    pub fn len(&self) -> usize {
        match &self.kind {
            OperationKind::Insert { content, .. } => content.chars().count(),
            OperationKind::Delete { length }
            | OperationKind::Retain { length, .. }
            | OperationKind::Format { length, .. } => *length,
        }
    }

    /// True when the operation changes nothing in the content or spans
    pub fn is_noop(&self) -> bool {
        match &self.kind {
            OperationKind::Retain { attributes, .. } => {
                self.len() == 0 || attributes.as_ref().is_none_or(TextAttributes::is_empty)
            }
            OperationKind::Format { attributes, .. } => self.len() == 0 || attributes.is_empty(),
            _ => self.len() == 0,
        }
    }

    /// Retain and Format never change content
    pub fn is_content_neutral(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::Retain { .. } | OperationKind::Format { .. }
        )
    }

    /// Attributes carried by the operation, if any
    pub fn attributes(&self) -> Option<&TextAttributes> {
        match &self.kind {
            OperationKind::Insert { attributes, .. } | OperationKind::Retain { attributes, .. } => {
                attributes.as_ref()
            }
            OperationKind::Format { attributes, .. } => Some(attributes),
            OperationKind::Delete { .. } => None,
        }
    }

    /// Exclusive end of the covered range, checked for overflow
    pub fn end(&self) -> Result<usize, TransformError> {
        self.position
            .checked_add(self.len())
            .ok_or(TransformError::Overflow {
                op: self.id,
                position: self.position,
                length: self.len(),
            })
    }

    /// Reject operations whose range cannot be represented
    pub fn validate(&self) -> Result<(), TransformError> {
        self.end().map(|_| ())
    }

    /// Order used when two inserts land on the same position: user, then
    /// time, then id. Identical on every replica.
    pub fn tie_break_cmp(&self, other: &Self) -> Ordering {
        self.user_id
            .cmp(&other.user_id)
            .then_with(|| self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Chronological order: time, then user, then id.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.user_id.cmp(&other.user_id))
            .then_with(|| self.id.cmp(&other.id))
    }
}
