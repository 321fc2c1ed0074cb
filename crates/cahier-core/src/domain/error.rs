//! Domain-level error taxonomy for Cahier.

use cahier_llm::LlmError;

use super::version::{RequestId, VersionId};

/// Cahier domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CahierError {
    #[error("unknown parent version: {0}")]
    UnknownParent(VersionId),

    #[error("version not found: {0}")]
    NotFound(VersionId),

    /// Ancestry walk revisited a version. The store's own invariants rule
    /// this out, so it signals corrupted or hand-built history.
    #[error("cycle detected in version history at {0}")]
    CycleDetected(VersionId),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("agent name must not be empty")]
    EmptyAgentName,

    #[error("dependency request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("duplicate version id: {0}")]
    DuplicateVersion(VersionId),

    #[error("digest mismatch for {version}: expected {expected}, got {actual}")]
    DigestMismatch {
        version: VersionId,
        expected: String,
        actual: String,
    },

    #[error("no user input has been set for this session")]
    MissingUserInput,

    #[error("version {version} is a {actual} record, expected {expected}")]
    UnexpectedModification {
        version: VersionId,
        expected: String,
        actual: String,
    },

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Cahier domain operations.
pub type Result<T> = std::result::Result<T, CahierError>;
