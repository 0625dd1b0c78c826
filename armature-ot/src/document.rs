//! Document state and operation application
//!
//! [`apply_operation`] is a pure state transition: it takes a
//! [`DocumentState`] and an operation that has already been transformed
//! against everything applied since it was created, and returns the next
//! state. The input state is never modified; a rejected operation leaves the
//! caller holding the unchanged state.
//!
//! Formatting is stored as layers, one per formatting write. Each layer
//! follows later edits with the same arithmetic as [`crate::position`]:
//!
//! - Insert: layers starting at or after the insert point shift right; a
//!   layer strictly containing it grows.
//! - Delete: layers are clipped to what survives; layers entirely inside the
//!   deleted range disappear.
//!
//! A format operation transformed against a concurrent insert or delete
//! moves by exactly the same rule, so every replica ends up with the same
//! set of layers regardless of arrival order. Layers are never merged with
//! each other; a join created by a delete must not decide whether a later
//! insert picks up formatting.
//!
//! [`DocumentState::spans`] is the flattened view: layers are overlaid in
//! writer order (timestamp, then user, then operation id), so the later
//! writer wins per key, and equal neighbours are coalesced.

use crate::position::transform_range;
use crate::{Operation, OperationKind, OtError, OtResult, TextAttributes, TransformError};
use chrono::{DateTime, Utc};
use ropey::Rope;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A `[start, end)` run of content sharing one set of attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    /// First character (inclusive)
    pub start: usize,
    /// End (exclusive)
    pub end: usize,
    /// Formatting of the run
    pub attributes: TextAttributes,
}

impl TextSpan {
    /// Create a span
    pub fn new(start: usize, end: usize, attributes: TextAttributes) -> Self {
        Self {
            start,
            end,
            attributes,
        }
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for a zero-width span
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `index` falls inside the span
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Who wrote a formatting layer; orders overlapping layers
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerOrigin {
    /// Timestamp of the writing operation
    pub timestamp: DateTime<Utc>,
    /// Author
    pub user_id: String,
    /// Writing operation
    pub operation_id: Uuid,
}

impl LayerOrigin {
    fn of(op: &Operation) -> Self {
        Self {
            timestamp: op.timestamp,
            user_id: op.user_id.clone(),
            operation_id: op.id,
        }
    }
}

/// One formatting write, tracked through every later edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatLayer {
    /// First character (inclusive)
    pub start: usize,
    /// End (exclusive)
    pub end: usize,
    /// Attributes written
    pub attributes: TextAttributes,
    /// `None` for formatting the document was created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<LayerOrigin>,
}

/// Snapshot of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Current text
    pub content: String,
    /// Sorted, disjoint formatting spans (derived from `layers`)
    pub spans: Vec<TextSpan>,
    /// Formatting writes in overlay order
    #[serde(default)]
    pub layers: Vec<FormatLayer>,
    /// Every operation applied since creation, in order
    pub operations: Vec<Operation>,
    /// Number of operations applied since creation
    pub version: u64,
    /// When the last operation was applied
    pub last_modified: DateTime<Utc>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new("")
    }
}

impl DocumentState {
    /// Create a document at version 0
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            spans: Vec::new(),
            layers: Vec::new(),
            operations: Vec::new(),
            version: 0,
            last_modified: Utc::now(),
        }
    }

    /// Attach initial formatting; spans must be sorted, non-empty, disjoint
    /// and inside the content.
    pub fn with_spans(mut self, spans: Vec<TextSpan>) -> OtResult<Self> {
        let len = self.char_len();
        let mut previous_end = 0;
        for span in &spans {
            if span.is_empty() || span.start < previous_end || span.end > len {
                return Err(OtError::InvalidSpans(format!(
                    "span {}..{} in a document of {} characters",
                    span.start, span.end, len
                )));
            }
            previous_end = span.end;
        }
        self.layers = spans
            .into_iter()
            .filter(|span| !span.attributes.is_empty())
            .map(|span| FormatLayer {
                start: span.start,
                end: span.end,
                attributes: span.attributes,
                origin: None,
            })
            .collect();
        self.spans = flatten(&self.layers);
        Ok(self)
    }

    /// Content length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Attributes in effect at a character offset
    pub fn attributes_at(&self, index: usize) -> Option<&TextAttributes> {
        self.spans
            .iter()
            .find(|span| span.contains(index))
            .map(|span| &span.attributes)
    }

    /// Operations applied after `version`
    pub fn operations_since(&self, version: u64) -> &[Operation] {
        let from = usize::try_from(version)
            .unwrap_or(usize::MAX)
            .min(self.operations.len());
        &self.operations[from..]
    }

    /// Apply an operation, see [`apply_operation`]
    pub fn apply(&self, op: &Operation) -> Result<Self, TransformError> {
        apply_operation(self, op)
    }
}

/// Apply an already-transformed operation and return the next state.
///
/// Fails with [`TransformError::OutOfBounds`] if the operation reaches past
/// the end of the content. That indicates a transform bug upstream; the
/// operation is rejected rather than clamped.
pub fn apply_operation(state: &DocumentState, op: &Operation) -> Result<DocumentState, TransformError> {
    let mut text = Rope::from_str(&state.content);
    let len = text.len_chars();
    let start = op.position;
    let end = op.end()?;

    let limit = match op.kind {
        OperationKind::Insert { .. } => start,
        _ => end,
    };
    if limit > len {
        warn!(
            op = %op.id,
            kind = op.kind_name(),
            position = start,
            end,
            content_len = len,
            "Rejected operation outside document bounds"
        );
        return Err(TransformError::OutOfBounds {
            op: op.id,
            position: start,
            end,
            content_len: len,
        });
    }

    let layers = match &op.kind {
        OperationKind::Insert {
            content,
            attributes,
        } => {
            text.insert(start, content);
            let shifted = shift_layers(&state.layers, op);
            match attributes {
                Some(attrs) => add_layer(shifted, op, end, attrs),
                None => shifted,
            }
        }
        OperationKind::Delete { .. } => {
            text.remove(start..end);
            shift_layers(&state.layers, op)
        }
        OperationKind::Retain { attributes, .. } => match attributes {
            Some(attrs) => add_layer(state.layers.clone(), op, end, attrs),
            None => state.layers.clone(),
        },
        OperationKind::Format { attributes, .. } => {
            add_layer(state.layers.clone(), op, end, attributes)
        }
    };

    let mut operations = Vec::with_capacity(state.operations.len() + 1);
    operations.extend_from_slice(&state.operations);
    operations.push(op.clone());

    Ok(DocumentState {
        content: text.to_string(),
        spans: flatten(&layers),
        layers,
        operations,
        version: state.version + 1,
        last_modified: Utc::now(),
    })
}

fn shift_layers(layers: &[FormatLayer], op: &Operation) -> Vec<FormatLayer> {
    let mut moved: Vec<FormatLayer> = layers
        .iter()
        .filter_map(|layer| {
            let (start, end) = transform_range(layer.start, layer.end, op);
            (start < end).then(|| FormatLayer {
                start,
                end,
                ..layer.clone()
            })
        })
        .collect();
    sort_layers(&mut moved);
    moved
}

fn add_layer(
    mut layers: Vec<FormatLayer>,
    op: &Operation,
    end: usize,
    attrs: &TextAttributes,
) -> Vec<FormatLayer> {
    if op.position >= end || attrs.is_empty() {
        return layers;
    }
    layers.push(FormatLayer {
        start: op.position,
        end,
        attributes: attrs.clone(),
        origin: Some(LayerOrigin::of(op)),
    });
    sort_layers(&mut layers);
    layers
}

/// Base layers first, then writer order.
fn sort_layers(layers: &mut [FormatLayer]) {
    layers.sort_by(|a, b| {
        a.origin
            .cmp(&b.origin)
            .then(a.start.cmp(&b.start))
            .then(a.end.cmp(&b.end))
    });
}

/// Overlay layers into sorted, disjoint spans, coalescing equal neighbours.
fn flatten(layers: &[FormatLayer]) -> Vec<TextSpan> {
    let mut bounds: Vec<usize> = layers.iter().flat_map(|l| [l.start, l.end]).collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut spans: Vec<TextSpan> = Vec::new();
    for pair in bounds.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let attributes = layers
            .iter()
            .filter(|l| l.start <= from && to <= l.end)
            .fold(TextAttributes::new(), |acc, l| acc.merge(&l.attributes));
        if attributes.is_empty() {
            continue;
        }
        match spans.last_mut() {
            Some(last) if last.end == from && last.attributes == attributes => last.end = to,
            _ => spans.push(TextSpan::new(from, to, attributes)),
        }
    }
    spans
}
