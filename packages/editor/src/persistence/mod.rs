//! # Persistence seam
//!
//! The editor consumes two backend calls:
//!
//! ```text
//! save(documentId, baseVersion, version, blocks) → { newVersion } | Conflict | Transient
//! load(documentId)                              → Document | NotFound
//! ```
//!
//! `base_version` is the last version this session saw persisted; a backend
//! holding anything else reports a conflict. Saves are idempotent per
//! `(document_id, version)`: re-sending a version that is already stored
//! acknowledges it again, so retries are safe.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::{MemoryBackend, SaveOutcome};

use crate::block::Block;
use crate::ids::DocumentId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload of one save attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub document_id: DocumentId,
    pub base_version: u64,
    pub version: u64,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub new_version: u64,
}

/// Stored form of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    pub id: DocumentId,
    pub version: u64,
    pub blocks: Vec<Block>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    /// Another actor advanced the stored version
    #[error("Version conflict: stored version is {remote_version}")]
    Conflict { remote_version: u64 },

    /// Network or server hiccup; safe to retry
    #[error("Transient save failure: {0}")]
    Transient(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait PersistenceApi: Send + Sync {
    async fn save(&self, request: SaveRequest) -> Result<SaveAck, PersistError>;

    async fn load(&self, document_id: &DocumentId) -> Result<PersistedDocument, LoadError>;
}

/// Shared acceptance rule for backends holding `stored`
pub(crate) fn check_save(stored: Option<&PersistedDocument>, request: &SaveRequest) -> Result<Option<SaveAck>, PersistError> {
    let stored_version = stored.map(|d| d.version).unwrap_or(0);

    // Retry of a save that already landed
    if stored_version == request.version && stored.map(|d| d.blocks == request.blocks).unwrap_or(false) {
        return Ok(Some(SaveAck {
            new_version: stored_version,
        }));
    }

    if stored_version != request.base_version {
        return Err(PersistError::Conflict {
            remote_version: stored_version,
        });
    }

    Ok(None)
}
