//! Fuzz target for the transform engine.
//!
//! Builds two concurrent operations against a random document and checks
//! that both application orders produce the same content and spans.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use armature_ot::{
    ConflictResolver, DocumentState, Operation, ResolutionStrategy, TextAttributes,
    TransformContext, Transformer,
};

/// Arbitrary pair of concurrent edits.
#[derive(Debug, Arbitrary)]
struct FuzzPair {
    content: String,
    a: FuzzOp,
    b: FuzzOp,
    strategy: FuzzStrategy,
}

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Insert { position: u16, text: String, bold: Option<bool> },
    Delete { position: u16, length: u16 },
    Retain { position: u16, length: u16 },
    Format { position: u16, length: u16, bold: bool },
}

#[derive(Debug, Arbitrary)]
enum FuzzStrategy {
    Timestamp,
    UserPriority,
    Merge,
}

impl FuzzOp {
    /// Clamp into the document so the operation is valid on the base.
    fn to_operation(&self, user: &str, len: usize) -> Operation {
        let clamp = |position: u16, length: u16| {
            let position = (position as usize).min(len);
            (position, (length as usize).min(len - position))
        };
        match self {
            FuzzOp::Insert { position, text, bold } => {
                let op = Operation::insert(user, (*position as usize).min(len), text.as_str());
                match bold {
                    Some(bold) => op.with_attributes(TextAttributes::new().bold(*bold)),
                    None => op,
                }
            }
            FuzzOp::Delete { position, length } => {
                let (p, n) = clamp(*position, *length);
                Operation::delete(user, p, n)
            }
            FuzzOp::Retain { position, length } => {
                let (p, n) = clamp(*position, *length);
                Operation::retain(user, p, n)
            }
            FuzzOp::Format {
                position,
                length,
                bold,
            } => {
                let (p, n) = clamp(*position, *length);
                Operation::format(user, p, n, TextAttributes::new().bold(*bold))
            }
        }
    }
}

fuzz_target!(|input: FuzzPair| {
    let base = DocumentState::new(input.content.as_str());
    let len = base.char_len();
    let a = input.a.to_operation("alice", len);
    let b = input.b.to_operation("bob", len);

    let strategy = match input.strategy {
        FuzzStrategy::Timestamp => ResolutionStrategy::Timestamp,
        FuzzStrategy::UserPriority => ResolutionStrategy::UserPriority,
        FuzzStrategy::Merge => ResolutionStrategy::Merge,
    };
    let Ok(engine) = Transformer::new(ConflictResolver::new(strategy)) else {
        return;
    };
    let ctx = TransformContext::default();

    let (Ok(b_after_a), Ok(a_after_b)) = (engine.transform(&b, &a, &ctx), engine.transform(&a, &b, &ctx)) else {
        panic!("transform failed on valid operations");
    };

    let left = base
        .apply(&a)
        .and_then(|s| s.apply(&b_after_a.transformed_operation));
    let right = base
        .apply(&b)
        .and_then(|s| s.apply(&a_after_b.transformed_operation));

    match (left, right) {
        (Ok(left), Ok(right)) => {
            assert_eq!(left.content, right.content);
            assert_eq!(left.spans, right.spans);
        }
        (left, right) => panic!("apply failed: {:?} / {:?}", left.err(), right.err()),
    }
});
