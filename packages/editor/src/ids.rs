//! Document and block identifiers.
//!
//! Block ids are `{seed}-{n}` where `seed` is the CRC32 of the document id,
//! so ids are readable, stable for the block's lifetime, and never reused
//! within a document.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Seed derived from a document id using CRC32
pub fn document_seed(document_id: &DocumentId) -> String {
    let mut hasher = Hasher::new();
    hasher.update(document_id.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential block id generator for one document
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(document_id: &DocumentId) -> Self {
        Self {
            seed: document_seed(document_id),
            count: 0,
        }
    }

    /// Generator that continues after every id already in `existing`
    pub fn resume<'a>(document_id: &DocumentId, existing: impl IntoIterator<Item = &'a BlockId>) -> Self {
        let mut generator = Self::new(document_id);
        let prefix = format!("{}-", generator.seed);

        generator.count = existing
            .into_iter()
            .filter_map(|id| id.as_str().strip_prefix(&prefix))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        generator
    }

    pub fn next_id(&mut self) -> BlockId {
        self.count += 1;
        BlockId(format!("{}-{}", self.seed, self.count))
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
