//! # Intents
//!
//! Everything the palette, canvas and inspector want to change is expressed
//! as an [`Intent`] and handed to the document store. Intents are plain data:
//! they can be logged, scripted from JSON, and replayed.
//!
//! ## Semantics
//!
//! ### InsertBlock
//! - Index clamped to `[0, len]`
//! - New block gets registry defaults and becomes the selection
//!
//! ### DeleteBlock
//! - Clears the selection only if it pointed at the deleted block
//!
//! ### ReorderBlock
//! - `to_index` must be `< len`
//! - Moving to the current index changes nothing (no version bump)
//!
//! ### UpdateProperty
//! - Key must be in the block's schema, value must pass its constraints
//! - Rejected values leave the document untouched
//!
//! ### SelectBlock
//! - Not content: never bumps the version

use crate::ids::BlockId;
use blockwright_schema::{BlockType, PropertyValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum Intent {
    #[serde(rename_all = "camelCase")]
    InsertBlock { block_type: BlockType, index: usize },

    DeleteBlock { id: BlockId },

    #[serde(rename_all = "camelCase")]
    ReorderBlock { id: BlockId, to_index: usize },

    UpdateProperty {
        id: BlockId,
        key: String,
        value: PropertyValue,
    },

    SelectBlock { id: Option<BlockId> },
}

impl Intent {
    /// Debug name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Intent::InsertBlock { .. } => "insert_block",
            Intent::DeleteBlock { .. } => "delete_block",
            Intent::ReorderBlock { .. } => "reorder_block",
            Intent::UpdateProperty { .. } => "update_property",
            Intent::SelectBlock { .. } => "select_block",
        }
    }

    /// Whether a successful application changes persisted content
    pub fn is_content_change(&self) -> bool {
        !matches!(self, Intent::SelectBlock { .. })
    }
}

/// Result of dispatching an intent
#[derive(Debug, Clone, PartialEq)]
pub struct IntentOutcome {
    /// Document version after the intent
    pub version: u64,

    /// False for no-ops (e.g. reorder onto the same index)
    pub changed: bool,

    /// Id of the block created by an insert
    pub inserted: Option<BlockId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_json_shape() {
        let json = r#"[
            { "intent": "insertBlock", "blockType": "heading", "index": 0 },
            { "intent": "reorderBlock", "id": "a-1", "toIndex": 2 },
            { "intent": "updateProperty", "id": "a-1", "key": "level", "value": 3 },
            { "intent": "selectBlock", "id": null }
        ]"#;

        let intents: Vec<Intent> = serde_json::from_str(json).unwrap();
        assert_eq!(
            intents[0],
            Intent::InsertBlock {
                block_type: BlockType::from("heading"),
                index: 0
            }
        );
        assert_eq!(
            intents[2],
            Intent::UpdateProperty {
                id: BlockId::from("a-1"),
                key: "level".to_string(),
                value: PropertyValue::Number(3.0),
            }
        );
        assert_eq!(intents[3], Intent::SelectBlock { id: None });
        assert!(!intents[3].is_content_change());
    }
}
