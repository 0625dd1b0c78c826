//! Pairwise operation transform
//!
//! `transform(a, b)` rewrites `a` so that it can be applied after `b` has
//! already been applied. Two replicas that apply the same pair in opposite
//! orders end up with the same content:
//!
//! ```text
//! apply(apply(s, a), transform(b, a)) == apply(apply(s, b), transform(a, b))
//! ```
//!
//! Dispatch is on the pair of operation kinds:
//!
//! | op \ applied | Insert | Delete | Retain / Format |
//! |--------------|--------|--------|-----------------|
//! | Insert | shift, tie-break on equal position | shift, conflict if inside | unchanged |
//! | Delete | shift, conflict (grow) if around | subtract overlap, conflict on overlap | unchanged |
//! | Retain / Format | shift or grow | shrink | unchanged |
//!
//! When an insert falls strictly inside a concurrent delete, the delete
//! swallows the inserted text on both replicas; that is the only outcome a
//! single operation per side can express. The conflict resolver decides who
//! lost and therefore who must rebase.
//!
//! Attribute writes never move other operations and are never rewritten
//! against each other. Overlaps are settled when the document overlays
//! them in writer order (see [`crate::document`]).

use crate::{
    ConflictKind, ConflictResolution, ConflictResolver, EngineConfig, ManualResolver, Operation,
    OperationKind, OtResult, TransformContext, TransformError,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Result of transforming one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    /// The operation, adjusted to apply after the concurrent one(s)
    pub transformed_operation: Operation,
    /// True if the operation lost a conflict and downstream edits must rebase
    pub requires_rebase: bool,
    /// How the first conflict was decided, if there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolution>,
}

impl TransformResult {
    fn unchanged(op: &Operation) -> Self {
        Self::from_step(op, op.clone(), None)
    }

    fn from_step(
        original: &Operation,
        transformed: Operation,
        conflict: Option<ConflictResolution>,
    ) -> Self {
        let requires_rebase = conflict.as_ref().is_some_and(|c| c.lost(original));
        Self {
            transformed_operation: transformed,
            requires_rebase,
            conflict_resolution: conflict,
        }
    }
}

/// Transform engine bound to a conflict strategy
///
/// # Example
///
/// ```rust
/// use armature_ot::{Operation, TransformContext, Transformer};
///
/// let engine = Transformer::default();
/// let ctx = TransformContext::default();
///
/// let theirs = Operation::insert("alice", 2, "xyz");
/// let mine = Operation::insert("bob", 5, "!");
///
/// let result = engine.transform(&mine, &theirs, &ctx).unwrap();
/// assert_eq!(result.transformed_operation.position, 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    resolver: ConflictResolver,
}

impl Transformer {
    /// Create an engine; fails if the resolver cannot handle its strategy
    pub fn new(resolver: ConflictResolver) -> OtResult<Self> {
        resolver.check()?;
        Ok(Self { resolver })
    }

    /// Create an engine from config
    pub fn from_config(config: &EngineConfig) -> OtResult<Self> {
        Self::new(ConflictResolver::new(config.strategy))
    }

    /// Create an engine from config with a manual conflict handler
    pub fn from_config_with_handler(
        config: &EngineConfig,
        handler: Arc<dyn ManualResolver>,
    ) -> OtResult<Self> {
        Self::new(ConflictResolver::new(config.strategy).with_manual_handler(handler))
    }

    /// The conflict resolver in use
    pub fn resolver(&self) -> &ConflictResolver {
        &self.resolver
    }

    /// Transform `op` so it can be applied after `applied`.
    pub fn transform(
        &self,
        op: &Operation,
        applied: &Operation,
        context: &TransformContext,
    ) -> OtResult<TransformResult> {
        if op.id == applied.id {
            return Ok(TransformResult::unchanged(op));
        }

        op.validate()?;
        applied.validate()?;

        if applied.is_noop() {
            return Ok(TransformResult::unchanged(op));
        }

        use OperationKind::*;
        let (transformed, conflict) = match (&op.kind, &applied.kind) {
            (Insert { .. }, Insert { .. }) => (insert_after_insert(op, applied)?, None),
            (Insert { .. }, Delete { .. }) => self.insert_after_delete(op, applied, context)?,
            (Insert { .. }, Retain { .. }) => (op.clone(), None),
            (Insert { .. }, Format { .. }) => (op.clone(), None),

            (Delete { .. }, Insert { .. }) => self.delete_after_insert(op, applied, context)?,
            (Delete { .. }, Delete { .. }) => self.delete_after_delete(op, applied, context)?,
            (Delete { .. }, Retain { .. }) => (op.clone(), None),
            (Delete { .. }, Format { .. }) => (op.clone(), None),

            (Retain { .. }, Insert { .. }) => (range_after_insert(op, applied)?, None),
            (Format { .. }, Insert { .. }) => (range_after_insert(op, applied)?, None),
            (Retain { .. }, Delete { .. }) => (range_after_delete(op, applied)?, None),
            (Format { .. }, Delete { .. }) => (range_after_delete(op, applied)?, None),

            (Retain { .. }, Retain { .. }) => (op.clone(), None),
            (Retain { .. }, Format { .. }) => (op.clone(), None),
            (Format { .. }, Retain { .. }) => (op.clone(), None),
            (Format { .. }, Format { .. }) => (op.clone(), None),
        };

        transformed.validate()?;
        Ok(TransformResult::from_step(op, transformed, conflict))
    }

    /// Transform `op` against every operation in `concurrent`, in order.
    ///
    /// `requires_rebase` is set if any step lost a conflict. Only the first
    /// conflict resolution is reported.
    pub fn transform_against_operations(
        &self,
        op: &Operation,
        concurrent: &[Operation],
        context: &TransformContext,
    ) -> OtResult<TransformResult> {
        let mut current = op.clone();
        let mut requires_rebase = false;
        let mut first_conflict = None;

        for applied in concurrent {
            let step = self.transform(&current, applied, context)?;
            requires_rebase |= step.requires_rebase;
            if first_conflict.is_none() {
                first_conflict = step.conflict_resolution;
            }
            current = step.transformed_operation;
        }

        debug!(
            op = %op.id,
            kind = op.kind_name(),
            concurrent = concurrent.len(),
            from = op.position,
            to = current.position,
            requires_rebase,
            "Transformed operation against concurrent set"
        );

        Ok(TransformResult {
            transformed_operation: current,
            requires_rebase,
            conflict_resolution: first_conflict,
        })
    }

    fn insert_after_delete(
        &self,
        op: &Operation,
        applied: &Operation,
        context: &TransformContext,
    ) -> OtResult<(Operation, Option<ConflictResolution>)> {
        let start = applied.position;
        let end = applied.end()?;

        if op.position <= start {
            return Ok((op.clone(), None));
        }
        if op.position >= end {
            return Ok((op.at(retreat(op, op.position, applied.len())?), None));
        }

        // Inside the deleted range: the text goes with it.
        let mut absorbed = op.at(start);
        if let OperationKind::Insert { content, .. } = &mut absorbed.kind {
            content.clear();
        }
        if op.is_noop() {
            return Ok((absorbed, None));
        }
        let resolution =
            self.resolver
                .resolve(op, applied, ConflictKind::InsertInsideDelete, context)?;
        Ok((absorbed, Some(resolution)))
    }

    fn delete_after_insert(
        &self,
        op: &Operation,
        applied: &Operation,
        context: &TransformContext,
    ) -> OtResult<(Operation, Option<ConflictResolution>)> {
        let inserted = applied.len();

        if applied.position <= op.position {
            return Ok((op.at(advance(op, op.position, inserted)?), None));
        }
        if applied.position >= op.end()? {
            return Ok((op.clone(), None));
        }

        let grown = op.with_length(op.position, advance(op, op.len(), inserted)?);
        let resolution =
            self.resolver
                .resolve(op, applied, ConflictKind::DeleteAroundInsert, context)?;
        Ok((grown, Some(resolution)))
    }

    fn delete_after_delete(
        &self,
        op: &Operation,
        applied: &Operation,
        context: &TransformContext,
    ) -> OtResult<(Operation, Option<ConflictResolution>)> {
        let (position, length, overlap) = shrink_by_delete(op, applied)?;
        let shrunk = op.with_length(position, length);

        if overlap == 0 {
            return Ok((shrunk, None));
        }
        let resolution =
            self.resolver
                .resolve(op, applied, ConflictKind::OverlappingDeletes, context)?;
        Ok((shrunk, Some(resolution)))
    }
}

fn advance(op: &Operation, value: usize, by: usize) -> Result<usize, TransformError> {
    value.checked_add(by).ok_or(TransformError::Overflow {
        op: op.id,
        position: value,
        length: by,
    })
}

fn retreat(op: &Operation, value: usize, by: usize) -> Result<usize, TransformError> {
    value.checked_sub(by).ok_or(TransformError::Negative {
        op: op.id,
        field: "position",
    })
}

fn insert_after_insert(op: &Operation, applied: &Operation) -> Result<Operation, TransformError> {
    let stays = match op.position.cmp(&applied.position) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => op.tie_break_cmp(applied) == Ordering::Less,
    };
    if stays {
        Ok(op.clone())
    } else {
        Ok(op.at(advance(op, op.position, applied.len())?))
    }
}

/// New position and length of a range after `applied` (a delete) removed
/// its characters, plus how many characters both ranges shared.
fn shrink_by_delete(
    op: &Operation,
    applied: &Operation,
) -> Result<(usize, usize, usize), TransformError> {
    let (start, end) = (op.position, op.end()?);
    let (del_start, del_end) = (applied.position, applied.end()?);

    let overlap = end.min(del_end).saturating_sub(start.max(del_start));
    let removed_before = if del_start < start {
        del_end.min(start) - del_start
    } else {
        0
    };

    let position = retreat(op, start, removed_before)?;
    let length = op.len().checked_sub(overlap).ok_or(TransformError::Negative {
        op: op.id,
        field: "length",
    })?;
    Ok((position, length, overlap))
}

fn range_after_insert(op: &Operation, applied: &Operation) -> Result<Operation, TransformError> {
    let inserted = applied.len();
    if applied.position <= op.position {
        Ok(op.at(advance(op, op.position, inserted)?))
    } else if applied.position >= op.end()? {
        Ok(op.clone())
    } else {
        // Text typed inside a formatted range picks up the formatting.
        Ok(op.with_length(op.position, advance(op, op.len(), inserted)?))
    }
}

fn range_after_delete(op: &Operation, applied: &Operation) -> Result<Operation, TransformError> {
    let (position, length, _) = shrink_by_delete(op, applied)?;
    Ok(op.with_length(position, length))
}

/// Transform `op` against `applied` with the default (timestamp) strategy.
pub fn transform(
    op: &Operation,
    applied: &Operation,
    context: &TransformContext,
) -> OtResult<TransformResult> {
    Transformer::default().transform(op, applied, context)
}

/// Transform `op` against an ordered concurrent set with the default
/// (timestamp) strategy.
pub fn transform_against_operations(
    op: &Operation,
    concurrent: &[Operation],
    context: &TransformContext,
) -> OtResult<TransformResult> {
    Transformer::default().transform_against_operations(op, concurrent, context)
}
