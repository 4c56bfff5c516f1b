use crate::types::{BlockType, PropertyKind};
use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown block type: {0}")]
    UnknownBlockType(BlockType),

    #[error("Invalid schema for {block_type}: {reason}")]
    InvalidSchema { block_type: BlockType, reason: String },

    #[error("Invalid property value: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SchemaError {
    pub fn invalid_schema(block_type: &BlockType, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            block_type: block_type.clone(),
            reason: reason.into(),
        }
    }
}

/// Why a property value was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{block_type} has no property `{key}`")]
    UnknownProperty { block_type: BlockType, key: String },

    #[error("`{key}` expects a {expected} value, got {found}")]
    WrongKind {
        key: String,
        expected: PropertyKind,
        found: &'static str,
    },

    #[error("`{key}` is required")]
    Required { key: String },

    #[error("`{key}` must be at least {min} characters")]
    TooShort { key: String, min: usize },

    #[error("`{key}` must be at most {max} characters")]
    TooLong { key: String, max: usize },

    #[error("`{key}` must be at least {min}")]
    BelowMinimum { key: String, min: f64 },

    #[error("`{key}` must be at most {max}")]
    AboveMaximum { key: String, max: f64 },

    #[error("`{key}` must be a whole number")]
    NotAnInteger { key: String },

    #[error("`{key}` must be a finite number")]
    NotFinite { key: String },

    #[error("`{key}` must be one of: {}", .options.join(", "))]
    NotAnOption {
        key: String,
        value: String,
        options: Vec<String>,
    },

    #[error("`{key}` does not match pattern {pattern}")]
    PatternMismatch { key: String, pattern: String },

    #[error("`{key}`: cannot read {input:?} as {expected}")]
    Unparseable {
        key: String,
        input: String,
        expected: PropertyKind,
    },
}

impl ValidationError {
    /// Property key the error refers to
    pub fn key(&self) -> &str {
        match self {
            ValidationError::UnknownProperty { key, .. }
            | ValidationError::WrongKind { key, .. }
            | ValidationError::Required { key }
            | ValidationError::TooShort { key, .. }
            | ValidationError::TooLong { key, .. }
            | ValidationError::BelowMinimum { key, .. }
            | ValidationError::AboveMaximum { key, .. }
            | ValidationError::NotAnInteger { key }
            | ValidationError::NotFinite { key }
            | ValidationError::NotAnOption { key, .. }
            | ValidationError::PatternMismatch { key, .. }
            | ValidationError::Unparseable { key, .. } => key,
        }
    }
}
