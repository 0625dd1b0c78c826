//! Transform context supplied by the session layer

use crate::Operation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inputs the engine needs beyond the two operations being transformed.
///
/// The engine only reads this; it is never mutated during a transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformContext {
    /// Document version the incoming operation was created against
    pub document_version: u64,
    /// Operations applied since that version, in application order
    pub concurrent_operations: Vec<Operation>,
    /// Priority per user for the user-priority strategy; higher wins
    pub user_priorities: HashMap<String, i64>,
}

impl TransformContext {
    /// Create a context for the given base version
    pub fn new(document_version: u64) -> Self {
        Self {
            document_version,
            ..Default::default()
        }
    }

    /// Set the concurrent operations
    pub fn with_concurrent(mut self, ops: Vec<Operation>) -> Self {
        self.concurrent_operations = ops;
        self
    }

    /// Set one user's priority
    pub fn with_priority(mut self, user_id: impl Into<String>, priority: i64) -> Self {
        self.user_priorities.insert(user_id.into(), priority);
        self
    }

    /// Replace all priorities
    pub fn with_priorities(mut self, priorities: HashMap<String, i64>) -> Self {
        self.user_priorities = priorities;
        self
    }

    /// Priority of a user; unknown users rank 0
    pub fn priority_of(&self, user_id: &str) -> i64 {
        self.user_priorities.get(user_id).copied().unwrap_or(0)
    }
}
