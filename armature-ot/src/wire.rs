//! Wire messages between clients and a document session
//!
//! Messages are JSON, framed by the transport. Operations travel in the
//! same shape they serialize to everywhere else in the crate.

use crate::{AppliedOperation, DocumentState, Operation, OtError, OtResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Client/server message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    /// Client submits an operation made against `base_version`
    #[serde(rename_all = "camelCase")]
    Submit {
        /// Document ID
        doc_id: String,
        /// Last version the client had seen
        base_version: u64,
        /// The operation
        operation: Operation,
    },
    /// Server confirms (to the author) or relays (to everyone else) a commit
    Applied(AppliedOperation),
    /// Client asks for the full state
    #[serde(rename_all = "camelCase")]
    SnapshotRequest {
        /// Document ID
        doc_id: String,
    },
    /// Full document state
    #[serde(rename_all = "camelCase")]
    Snapshot {
        /// Document ID
        doc_id: String,
        /// Current state
        state: DocumentState,
    },
    /// Request failed
    Error {
        /// Error code
        code: WireErrorCode,
        /// Error message
        message: String,
    },
}

/// Wire error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorCode {
    /// Unknown error
    Unknown,
    /// Document not found
    DocumentNotFound,
    /// Operation malformed or out of range
    InvalidOperation,
    /// Base version ahead of the document
    VersionMismatch,
    /// Conflict could not be resolved
    ConflictUnresolved,
    /// Message could not be decoded
    MalformedMessage,
}

impl From<&OtError> for WireErrorCode {
    fn from(err: &OtError) -> Self {
        match err {
            OtError::Transform(_) | OtError::InvalidSpans(_) => WireErrorCode::InvalidOperation,
            OtError::Conflict(_) => WireErrorCode::ConflictUnresolved,
            OtError::UnknownVersion { .. } => WireErrorCode::VersionMismatch,
            OtError::DocumentNotFound(_) => WireErrorCode::DocumentNotFound,
            OtError::Serialization(_) => WireErrorCode::MalformedMessage,
            OtError::Config(_) => WireErrorCode::Unknown,
        }
    }
}

impl WireMessage {
    /// Error reply for a failed request
    pub fn error(err: &OtError) -> Self {
        WireMessage::Error {
            code: err.into(),
            message: err.to_string(),
        }
    }

    /// Document the message refers to, if any
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            WireMessage::Submit { doc_id, .. }
            | WireMessage::SnapshotRequest { doc_id }
            | WireMessage::Snapshot { doc_id, .. } => Some(doc_id),
            WireMessage::Applied(applied) => Some(&applied.doc_id),
            WireMessage::Error { .. } => None,
        }
    }

    /// Encode to a JSON frame
    pub fn to_bytes(&self) -> OtResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decode a JSON frame
    pub fn from_bytes(bytes: &[u8]) -> OtResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
