//! Per-document sequencing
//!
//! The transform and apply functions are pure, but operations for a single
//! document must still be applied one at a time and in one agreed order.
//! A [`DocumentSession`] owns one document's state and serializes
//! submissions through a write lock; different documents live in different
//! sessions and never contend.
//!
//! Clients submit an operation together with the version they last saw.
//! Everything applied since that version is concurrent with it, so the
//! operation is transformed against that slice of the log before being
//! applied. A client must keep at most one unacknowledged operation in
//! flight; its own earlier edits are otherwise treated as concurrent.

use crate::{
    DocumentState, EngineConfig, ManualResolver, Operation, OtError, OtResult, TransformContext,
    Transformer,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

/// An operation as it was committed to the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOperation {
    /// Document ID
    pub doc_id: String,
    /// The transformed operation that was applied
    pub operation: Operation,
    /// Version after applying
    pub version: u64,
    /// Whether the submitter lost a conflict and must rebase pending edits
    pub requires_rebase: bool,
}

/// Session events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// An operation was committed
    Applied(AppliedOperation),
    /// An operation was rejected
    Rejected {
        /// Offending operation
        op_id: uuid::Uuid,
        /// Error text
        reason: String,
    },
}

/// Sequencer for one document
pub struct DocumentSession {
    id: String,
    state: RwLock<DocumentState>,
    transformer: Transformer,
    priorities: parking_lot::RwLock<HashMap<String, i64>>,
    events: broadcast::Sender<SessionEvent>,
    created_at: DateTime<Utc>,
}

impl DocumentSession {
    /// Create a session with the default config
    pub fn new(id: impl Into<String>, state: DocumentState) -> Self {
        Self::with_transformer(id, state, Transformer::default(), &EngineConfig::default())
    }

    /// Create a session from config; fails if the config cannot resolve
    /// conflicts on its own (manual strategy without a handler).
    pub fn with_config(
        id: impl Into<String>,
        state: DocumentState,
        config: &EngineConfig,
    ) -> OtResult<Self> {
        let transformer = Transformer::from_config(config)?;
        Ok(Self::with_transformer(id, state, transformer, config))
    }

    /// Create a session with an explicit transformer
    pub fn with_transformer(
        id: impl Into<String>,
        state: DocumentState,
        transformer: Transformer,
        config: &EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let id = id.into();

        info!(
            doc_id = %id,
            version = state.version,
            strategy = %transformer.resolver().strategy(),
            "Opened document session"
        );

        Self {
            id,
            state: RwLock::new(state),
            transformer,
            priorities: parking_lot::RwLock::new(HashMap::new()),
            events,
            created_at: Utc::now(),
        }
    }

    /// Document ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was opened
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Set a user's priority for the user-priority strategy
    pub fn set_user_priority(&self, user_id: impl Into<String>, priority: i64) {
        self.priorities.write().insert(user_id.into(), priority);
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> DocumentState {
        self.state.read().await.clone()
    }

    /// Current version
    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Current content
    pub async fn content(&self) -> String {
        self.state.read().await.content.clone()
    }

    /// Operations applied after `version`, for catching a client up
    pub async fn operations_since(&self, version: u64) -> Vec<Operation> {
        self.state.read().await.operations_since(version).to_vec()
    }

    /// Transform `op` against everything applied since `base_version`,
    /// apply it and broadcast the result.
    ///
    /// # Example
    ///
    /// ```rust
    /// use armature_ot::{DocumentSession, DocumentState, Operation};
    ///
    /// # tokio_test::block_on(async {
    /// let session = DocumentSession::new("doc-1", DocumentState::new("Hello world"));
    ///
    /// // Both clients last saw version 0
    /// session.submit(Operation::insert("alice", 6, "there "), 0).await?;
    /// let applied = session.submit(Operation::delete("bob", 0, 5), 0).await?;
    ///
    /// assert_eq!(applied.version, 2);
    /// assert_eq!(session.content().await, " there world");
    /// # Ok::<(), armature_ot::OtError>(())
    /// # }).unwrap();
    /// ```
    pub async fn submit(&self, op: Operation, base_version: u64) -> OtResult<AppliedOperation> {
        let mut state = self.state.write().await;

        if base_version > state.version {
            warn!(
                doc_id = %self.id,
                op = %op.id,
                base_version,
                current = state.version,
                "Operation references an unknown version"
            );
            return Err(OtError::UnknownVersion {
                doc_id: self.id.clone(),
                base: base_version,
                current: state.version,
            });
        }

        let concurrent = state.operations_since(base_version).to_vec();
        let context = TransformContext::new(base_version)
            .with_concurrent(concurrent)
            .with_priorities(self.priorities.read().clone());

        let outcome = self
            .transformer
            .transform_against_operations(&op, &context.concurrent_operations, &context)
            .and_then(|result| {
                let next = state.apply(&result.transformed_operation)?;
                Ok((result, next))
            });

        let (result, next) = match outcome {
            Ok(done) => done,
            Err(err) => {
                warn!(doc_id = %self.id, op = %op.id, error = %err, "Rejected operation");
                let _ = self.events.send(SessionEvent::Rejected {
                    op_id: op.id,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        *state = next;

        let applied = AppliedOperation {
            doc_id: self.id.clone(),
            operation: result.transformed_operation,
            version: state.version,
            requires_rebase: result.requires_rebase,
        };

        debug!(
            doc_id = %self.id,
            op = %applied.operation.id,
            version = applied.version,
            concurrent = context.concurrent_operations.len(),
            requires_rebase = applied.requires_rebase,
            "Applied operation"
        );

        let _ = self.events.send(SessionEvent::Applied(applied.clone()));
        Ok(applied)
    }
}

/// Registry of open document sessions, keyed by document ID
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<DocumentSession>>,
    config: EngineConfig,
    manual: Option<Arc<dyn ManualResolver>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            config: EngineConfig::default(),
            manual: None,
        }
    }
}

impl SessionRegistry {
    /// Create a registry; every session it opens uses `config`.
    ///
    /// Fails at construction if the config selects the manual strategy.
    /// Use [`with_manual_handler`](Self::with_manual_handler) for that.
    pub fn new(config: EngineConfig) -> OtResult<Self> {
        Transformer::from_config(&config)?;
        Ok(Self {
            sessions: DashMap::new(),
            config,
            manual: None,
        })
    }

    /// Create a registry whose sessions use a manual conflict handler
    pub fn with_manual_handler(
        config: EngineConfig,
        handler: Arc<dyn ManualResolver>,
    ) -> OtResult<Self> {
        Transformer::from_config_with_handler(&config, Arc::clone(&handler))?;
        Ok(Self {
            sessions: DashMap::new(),
            config,
            manual: Some(handler),
        })
    }

    fn transformer(&self) -> OtResult<Transformer> {
        match &self.manual {
            Some(handler) => Transformer::from_config_with_handler(&self.config, Arc::clone(handler)),
            None => Transformer::from_config(&self.config),
        }
    }

    /// Open a session for a document, or return the existing one
    pub fn open(&self, doc_id: &str, initial: DocumentState) -> OtResult<Arc<DocumentSession>> {
        if let Some(session) = self.sessions.get(doc_id) {
            return Ok(Arc::clone(&session));
        }

        let transformer = self.transformer()?;
        let session = self
            .sessions
            .entry(doc_id.to_string())
            .or_insert_with(|| {
                Arc::new(DocumentSession::with_transformer(
                    doc_id,
                    initial,
                    transformer,
                    &self.config,
                ))
            });
        Ok(Arc::clone(&session))
    }

    /// Get a session by document ID
    pub fn get(&self, doc_id: &str) -> OtResult<Arc<DocumentSession>> {
        self.sessions
            .get(doc_id)
            .map(|r| Arc::clone(&r))
            .ok_or_else(|| OtError::DocumentNotFound(doc_id.to_string()))
    }

    /// Close a session, returning its final state
    pub async fn close(&self, doc_id: &str) -> OtResult<DocumentState> {
        let (_, session) = self
            .sessions
            .remove(doc_id)
            .ok_or_else(|| OtError::DocumentNotFound(doc_id.to_string()))?;
        let state = session.snapshot().await;
        info!(doc_id, version = state.version, "Closed document session");
        Ok(state)
    }

    /// Open document IDs
    pub fn list(&self) -> Vec<String> {
        self.sessions.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of open sessions
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}
