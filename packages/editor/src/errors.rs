//! Error types for the editor

use crate::ids::{BlockId, DocumentId};
use crate::persistence::LoadError;
use blockwright_schema::{BlockType, SchemaError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Unknown block type: {0}")]
    UnknownBlockType(BlockType),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Index {index} out of range for {len} blocks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid property value: {0}")]
    InvalidPropertyValue(#[from] ValidationError),

    /// Fatal: no block can be rendered without schemas
    #[error("Block registry failed to load: {0}")]
    RegistryLoad(String),

    #[error("Failed to load document {document_id}: {source}")]
    Load {
        document_id: DocumentId,
        #[source]
        source: LoadError,
    },

    #[error("Invalid registry schema: {0}")]
    Schema(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Autosave is no longer running")]
    AutosaveStopped,
}

impl From<SchemaError> for EditorError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownBlockType(t) => EditorError::UnknownBlockType(t),
            SchemaError::Validation(v) => EditorError::InvalidPropertyValue(v),
            SchemaError::InvalidSchema { .. } => EditorError::Schema(e.to_string()),
            SchemaError::Parse(p) => EditorError::Serialization(p),
        }
    }
}

impl EditorError {
    /// Local errors are reported inline and never tear the editor down
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            EditorError::UnknownBlockType(_)
                | EditorError::BlockNotFound(_)
                | EditorError::IndexOutOfRange { .. }
                | EditorError::InvalidPropertyValue(_)
        )
    }
}
