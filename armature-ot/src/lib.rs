//! Operational Transformation Engine for Armature Framework
//!
//! Keeps concurrent edits to a shared text document convergent. Every
//! client edit is an [`Operation`]; before it is applied it is transformed
//! against the operations the client had not seen yet, then applied to a
//! [`DocumentState`] that advances one version per operation.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Operation Pipeline                         │
//! │                                                                  │
//! │  ┌──────────┐    ┌─────────────┐    ┌──────────┐                 │
//! │  │  Client  │───▶│  Transform  │───▶│ Document │───▶ broadcast    │
//! │  │   edit   │    │   Engine    │    │  State   │                  │
//! │  └──────────┘    └─────────────┘    └──────────┘                 │
//! │                        │                  │                      │
//! │                        ▼                  ▼                      │
//! │                  ┌──────────┐       ┌──────────┐                 │
//! │                  │ Conflict │       │   Diff   │                 │
//! │                  │ Resolver │       │  Report  │                 │
//! │                  └──────────┘       └──────────┘                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_ot::{DocumentState, Operation, TransformContext, transform};
//!
//! let base = DocumentState::new("Hello world");
//! let a = Operation::insert("alice", 6, "there ");
//! let b = Operation::delete("bob", 0, 5);
//! let ctx = TransformContext::default();
//!
//! let left = base
//!     .apply(&a)
//!     .unwrap()
//!     .apply(&transform(&b, &a, &ctx).unwrap().transformed_operation)
//!     .unwrap();
//! let right = base
//!     .apply(&b)
//!     .unwrap()
//!     .apply(&transform(&a, &b, &ctx).unwrap().transformed_operation)
//!     .unwrap();
//!
//! assert_eq!(left.content, " there world");
//! assert_eq!(left.content, right.content);
//! ```
//!
//! ## Conflict Strategies
//!
//! | Strategy | Winner of a destructive overlap |
//! |----------|---------------------------------|
//! | `timestamp` | Earlier timestamp (default) |
//! | `user-priority` | Higher priority, then earlier timestamp |
//! | `merge` | As `timestamp`, plus a suggested merged operation |
//! | `manual` | A registered [`ManualResolver`] |
//!
//! The strategy never changes the content the replicas converge to, not
//! even under `merge`. It decides which side is reported as the loser and
//! must rebase.

pub mod attributes;
pub mod config;
pub mod conflict;
pub mod context;
pub mod diff;
pub mod document;
pub mod error;
pub mod operation;
pub mod position;
pub mod session;
pub mod transform;
pub mod wire;

pub use attributes::*;
pub use config::*;
pub use conflict::*;
pub use context::*;
pub use diff::*;
pub use document::*;
pub use error::*;
pub use operation::*;
pub use position::*;
pub use session::*;
pub use transform::*;
pub use wire::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn converge(base: &DocumentState, a: &Operation, b: &Operation) -> (String, String) {
        let ctx = TransformContext::default();
        let b_after_a = transform(b, a, &ctx).unwrap().transformed_operation;
        let a_after_b = transform(a, b, &ctx).unwrap().transformed_operation;

        let left = base.apply(a).unwrap().apply(&b_after_a).unwrap();
        let right = base.apply(b).unwrap().apply(&a_after_b).unwrap();
        (left.content, right.content)
    }

    #[test]
    fn test_hello_world_scenario() {
        let base = DocumentState::new("Hello world");
        let a = Operation::insert("alice", 6, "there ");
        let b = Operation::delete("bob", 0, 5);

        let (left, right) = converge(&base, &a, &b);
        assert_eq!(left.as_bytes(), right.as_bytes());
        assert_eq!(left, " there world");
    }

    #[test]
    fn test_insert_insert_shift() {
        let ctx = TransformContext::default();
        let applied = Operation::insert("alice", 2, "xyz");
        let op = Operation::insert("bob", 5, "!");

        let result = transform(&op, &applied, &ctx).unwrap();
        assert_eq!(result.transformed_operation.position, 8);
    }

    #[test]
    fn test_delete_containment() {
        let ctx = TransformContext::default();
        let applied = Operation::delete("alice", 4, 3);
        let op = Operation::delete("bob", 2, 10);

        let result = transform(&op, &applied, &ctx).unwrap();
        assert_eq!(result.transformed_operation.position, 2);
        assert_eq!(result.transformed_operation.len(), 7);
    }

    #[test]
    fn test_version_monotonicity() {
        let mut state = DocumentState::new("");
        for i in 0..10 {
            state = state.apply(&Operation::insert("alice", i, "a")).unwrap();
        }
        assert_eq!(state.version, 10);
        assert_eq!(state.operations.len(), 10);
        assert_eq!(state.content, "aaaaaaaaaa");
    }

    #[test]
    fn test_diff_reports_insert() {
        let s0 = DocumentState::new("Hello");
        let op = Operation::insert("alice", 5, "!");
        let diff = calculate_diff(&s0, &s0.apply(&op).unwrap());

        assert_eq!(diff.added_text.len(), 1);
        assert_eq!(diff.added_text[0].text, "!");
        assert_eq!(diff.added_text[0].position, 5);
    }

    #[test]
    fn test_invalid_delete_rejected() {
        let state = DocumentState::new("abc");
        let err = state.apply(&Operation::delete("alice", 4, 1)).unwrap_err();

        assert!(matches!(err, TransformError::OutOfBounds { .. }));
        assert_eq!(state.content, "abc");
        assert_eq!(state.version, 0);
    }

    #[test]
    fn test_formatting_converges_with_edits() {
        let base = DocumentState::new("Hello world");
        let a = Operation::format("alice", 0, 5, TextAttributes::new().bold(true));
        let b = Operation::insert("bob", 2, "XX");

        let ctx = TransformContext::default();
        let left = base
            .apply(&a)
            .unwrap()
            .apply(&transform(&b, &a, &ctx).unwrap().transformed_operation)
            .unwrap();
        let right = base
            .apply(&b)
            .unwrap()
            .apply(&transform(&a, &b, &ctx).unwrap().transformed_operation)
            .unwrap();

        assert_eq!(left.content, right.content);
        assert_eq!(left.spans, right.spans);
        assert_eq!(left.spans, vec![TextSpan::new(0, 7, TextAttributes::new().bold(true))]);
    }
}
