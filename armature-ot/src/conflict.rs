//! Conflict resolution for destructive overlaps
//!
//! The transform engine calls into a [`ConflictResolver`] when two concurrent
//! operations touch the same characters in a way that cannot be satisfied
//! by shifting positions alone: an insert landing inside a deletion, or two
//! deletions that overlap.
//!
//! Resolution is a pure function of the two operations, the
//! [`TransformContext`] and the configured strategy. Every replica picks the
//! same winner.
//!
//! | Strategy | Winner |
//! |----------|--------|
//! | `timestamp` | Earlier timestamp (then user id, then op id) |
//! | `user-priority` | Higher `user_priorities` entry, ties by timestamp |
//! | `merge` | Timestamp winner, plus an advisory merged operation |
//! | `manual` | Whatever the registered [`ManualResolver`] decides |

use crate::{ConflictError, Operation, TransformContext};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How a destructive overlap is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Higher user priority wins
    UserPriority,
    /// Earlier edit wins
    #[default]
    Timestamp,
    /// Earlier edit wins and a merged operation is proposed.
    ///
    /// The applied content is the same as under `timestamp`: an insert
    /// caught in a deletion is still swallowed. The relocated insert is only
    /// offered as [`ConflictResolution::merged_result`] for the losing
    /// client to resubmit.
    Merge,
    /// An external handler decides
    Manual,
}

impl ResolutionStrategy {
    /// Parse a strategy name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user-priority" | "user_priority" | "priority" => Some(Self::UserPriority),
            "timestamp" => Some(Self::Timestamp),
            "merge" => Some(Self::Merge),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Strategy name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserPriority => "user-priority",
            Self::Timestamp => "timestamp",
            Self::Merge => "merge",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the overlap, seen from the operation being transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Transformed insert lands strictly inside an applied delete
    InsertInsideDelete,
    /// Applied insert landed strictly inside the transformed delete
    DeleteAroundInsert,
    /// Two deletes share at least one character
    OverlappingDeletes,
}

/// Which side of a conflicting pair wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The operation being transformed
    Transformed,
    /// The operation already applied
    Applied,
}

/// UI- or policy-driven conflict handler for the `manual` strategy.
///
/// Implementations must be deterministic: the same pair must produce the
/// same answer on every replica.
pub trait ManualResolver: Send + Sync {
    /// Pick the winner between `transformed` and the already `applied` op
    fn choose(
        &self,
        transformed: &Operation,
        applied: &Operation,
        context: &TransformContext,
    ) -> Result<Winner, ConflictError>;
}

/// Audit record of how a conflict was decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    /// Strategy that decided
    pub strategy: ResolutionStrategy,
    /// Operation whose intent was kept
    pub winning_operation: Operation,
    /// Operation that must be rebased
    pub losing_operation: Operation,
    /// Merged operation proposed by the `merge` strategy, in the coordinates
    /// of the document both operations were created against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_result: Option<Operation>,
}

impl ConflictResolution {
    /// True if `op` is the losing side
    pub fn lost(&self, op: &Operation) -> bool {
        self.losing_operation.id == op.id
    }
}

/// Decides destructive overlaps according to a [`ResolutionStrategy`]
#[derive(Clone, Default)]
pub struct ConflictResolver {
    strategy: ResolutionStrategy,
    manual: Option<Arc<dyn ManualResolver>>,
}

impl fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("strategy", &self.strategy)
            .field("manual", &self.manual.is_some())
            .finish()
    }
}

impl ConflictResolver {
    /// Create a resolver for a strategy
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self {
            strategy,
            manual: None,
        }
    }

    /// Register the handler used by the `manual` strategy
    pub fn with_manual_handler(mut self, handler: Arc<dyn ManualResolver>) -> Self {
        self.manual = Some(handler);
        self
    }

    /// Configured strategy
    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Verify the configuration can resolve every conflict
    pub fn check(&self) -> Result<(), ConflictError> {
        if self.strategy == ResolutionStrategy::Manual && self.manual.is_none() {
            return Err(ConflictError::UnhandledStrategy(ResolutionStrategy::Manual));
        }
        Ok(())
    }

    /// Decide a conflict between `transformed` and the already `applied` op.
    pub fn resolve(
        &self,
        transformed: &Operation,
        applied: &Operation,
        kind: ConflictKind,
        context: &TransformContext,
    ) -> Result<ConflictResolution, ConflictError> {
        let winner = match self.strategy {
            ResolutionStrategy::Timestamp | ResolutionStrategy::Merge => {
                by_timestamp(transformed, applied)
            }
            ResolutionStrategy::UserPriority => by_priority(transformed, applied, context),
            ResolutionStrategy::Manual => match &self.manual {
                Some(handler) => handler.choose(transformed, applied, context)?,
                None => {
                    return Err(ConflictError::UnhandledStrategy(ResolutionStrategy::Manual));
                }
            },
        };

        let merged_result = match self.strategy {
            ResolutionStrategy::Merge => Some(merge(transformed, applied, kind, winner)),
            _ => None,
        };

        let (winning, losing) = match winner {
            Winner::Transformed => (transformed, applied),
            Winner::Applied => (applied, transformed),
        };

        debug!(
            strategy = %self.strategy,
            kind = ?kind,
            winner = %winning.id,
            loser = %losing.id,
            "Resolved operation conflict"
        );

        Ok(ConflictResolution {
            strategy: self.strategy,
            winning_operation: winning.clone(),
            losing_operation: losing.clone(),
            merged_result,
        })
    }
}

fn by_timestamp(transformed: &Operation, applied: &Operation) -> Winner {
    match transformed.chronological_cmp(applied) {
        Ordering::Less => Winner::Transformed,
        _ => Winner::Applied,
    }
}

fn by_priority(transformed: &Operation, applied: &Operation, context: &TransformContext) -> Winner {
    let mine = context.priority_of(&transformed.user_id);
    let theirs = context.priority_of(&applied.user_id);
    match mine.cmp(&theirs) {
        Ordering::Greater => Winner::Transformed,
        Ordering::Less => Winner::Applied,
        Ordering::Equal => by_timestamp(transformed, applied),
    }
}

/// Merge heuristics. An insert caught in a deletion moves to the deletion
/// start with its text intact; overlapping deletions become one deletion
/// over the union of both ranges.
fn merge(transformed: &Operation, applied: &Operation, kind: ConflictKind, winner: Winner) -> Operation {
    match kind {
        ConflictKind::InsertInsideDelete => transformed.at(applied.position),
        ConflictKind::DeleteAroundInsert => applied.at(transformed.position),
        ConflictKind::OverlappingDeletes => {
            let start = transformed.position.min(applied.position);
            let end = transformed
                .position
                .saturating_add(transformed.len())
                .max(applied.position.saturating_add(applied.len()));
            let base = match winner {
                Winner::Transformed => transformed,
                Winner::Applied => applied,
            };
            base.with_length(start, end - start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, secs).unwrap()
    }

    struct AlwaysApplied;

    impl ManualResolver for AlwaysApplied {
        fn choose(
            &self,
            _transformed: &Operation,
            _applied: &Operation,
            _context: &TransformContext,
        ) -> Result<Winner, ConflictError> {
            Ok(Winner::Applied)
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            ResolutionStrategy::from_str("user-priority"),
            Some(ResolutionStrategy::UserPriority)
        );
        assert_eq!(
            ResolutionStrategy::from_str(" MERGE "),
            Some(ResolutionStrategy::Merge)
        );
        assert_eq!(ResolutionStrategy::from_str("random"), None);
        assert_eq!(ResolutionStrategy::default(), ResolutionStrategy::Timestamp);
    }

    #[test]
    fn test_strategy_wire_names() {
        let json = serde_json::to_string(&ResolutionStrategy::UserPriority).unwrap();
        assert_eq!(json, "\"user-priority\"");
    }

    #[test]
    fn test_timestamp_earlier_wins() {
        let early = Operation::insert("bob", 4, "x").with_timestamp(at(1));
        let late = Operation::delete("alice", 2, 5).with_timestamp(at(2));

        let resolver = ConflictResolver::new(ResolutionStrategy::Timestamp);
        let ctx = TransformContext::default();

        let res = resolver
            .resolve(&early, &late, ConflictKind::InsertInsideDelete, &ctx)
            .unwrap();
        assert_eq!(res.winning_operation.id, early.id);
        assert!(res.lost(&late));
        assert!(res.merged_result.is_none());

        // Same answer from the other replica's point of view
        let res = resolver
            .resolve(&late, &early, ConflictKind::DeleteAroundInsert, &ctx)
            .unwrap();
        assert_eq!(res.winning_operation.id, early.id);
    }

    #[test]
    fn test_timestamp_tie_uses_user_id() {
        let a = Operation::delete("alice", 0, 4).with_timestamp(at(5));
        let b = Operation::delete("bob", 2, 4).with_timestamp(at(5));

        let resolver = ConflictResolver::default();
        let ctx = TransformContext::default();
        let res = resolver
            .resolve(&b, &a, ConflictKind::OverlappingDeletes, &ctx)
            .unwrap();
        assert_eq!(res.winning_operation.user_id, "alice");
    }

    #[test]
    fn test_user_priority() {
        let admin = Operation::delete("admin", 0, 4).with_timestamp(at(9));
        let guest = Operation::delete("guest", 2, 4).with_timestamp(at(1));

        let resolver = ConflictResolver::new(ResolutionStrategy::UserPriority);
        let ctx = TransformContext::new(0).with_priority("admin", 10);

        let res = resolver
            .resolve(&guest, &admin, ConflictKind::OverlappingDeletes, &ctx)
            .unwrap();
        assert_eq!(res.winning_operation.user_id, "admin");
        assert_eq!(res.strategy, ResolutionStrategy::UserPriority);

        // Equal priorities fall back to timestamp
        let ctx = TransformContext::default();
        let res = resolver
            .resolve(&guest, &admin, ConflictKind::OverlappingDeletes, &ctx)
            .unwrap();
        assert_eq!(res.winning_operation.user_id, "guest");
    }

    #[test]
    fn test_merge_relocates_insert() {
        let del = Operation::delete("alice", 2, 6).with_timestamp(at(1));
        let ins = Operation::insert("bob", 5, "abc").with_timestamp(at(2));

        let resolver = ConflictResolver::new(ResolutionStrategy::Merge);
        let res = resolver
            .resolve(&ins, &del, ConflictKind::InsertInsideDelete, &TransformContext::default())
            .unwrap();

        let merged = res.merged_result.unwrap();
        assert_eq!(merged.id, ins.id);
        assert_eq!(merged.position, 2);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_unions_deletes() {
        let a = Operation::delete("alice", 2, 4).with_timestamp(at(1));
        let b = Operation::delete("bob", 4, 5).with_timestamp(at(2));

        let resolver = ConflictResolver::new(ResolutionStrategy::Merge);
        let res = resolver
            .resolve(&b, &a, ConflictKind::OverlappingDeletes, &TransformContext::default())
            .unwrap();

        let merged = res.merged_result.unwrap();
        assert_eq!(merged.id, a.id);
        assert_eq!((merged.position, merged.len()), (2, 7));
    }

    #[test]
    fn test_manual_requires_handler() {
        let resolver = ConflictResolver::new(ResolutionStrategy::Manual);
        assert_eq!(
            resolver.check(),
            Err(ConflictError::UnhandledStrategy(ResolutionStrategy::Manual))
        );

        let a = Operation::delete("alice", 0, 3);
        let b = Operation::delete("bob", 1, 3);
        assert!(
            resolver
                .resolve(&a, &b, ConflictKind::OverlappingDeletes, &TransformContext::default())
                .is_err()
        );
    }

    #[test]
    fn test_manual_handler_decides() {
        let resolver = ConflictResolver::new(ResolutionStrategy::Manual)
            .with_manual_handler(Arc::new(AlwaysApplied));
        assert!(resolver.check().is_ok());

        let a = Operation::delete("alice", 0, 3).with_timestamp(at(1));
        let b = Operation::delete("bob", 1, 3).with_timestamp(at(2));
        let res = resolver
            .resolve(&a, &b, ConflictKind::OverlappingDeletes, &TransformContext::default())
            .unwrap();
        assert_eq!(res.winning_operation.id, b.id);
        assert_eq!(res.strategy, ResolutionStrategy::Manual);
    }
}
