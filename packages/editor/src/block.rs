use crate::ids::BlockId;
use blockwright_schema::{BlockType, PropertyMap, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ordered unit of content.
///
/// Serialized as `{id, type, order, properties, updatedAt}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    /// Rank among siblings, dense `0..len` within a document
    pub order: usize,

    pub properties: PropertyMap,

    pub updated_at: DateTime<Utc>,
}

impl Block {
    pub fn new(id: BlockId, block_type: BlockType, order: usize, properties: PropertyMap) -> Self {
        Self {
            id,
            block_type,
            order,
            properties,
            updated_at: Utc::now(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Short text used by the canvas: the first non-empty string property
    pub fn summary(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.properties.get(*k))
            .filter_map(PropertyValue::as_str)
            .find(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
    }
}
