use crate::document::DocumentSnapshot;
use crate::intents::Intent;
use blockwright_schema::{BlockType, Registry};

/// One insertable block type
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub block_type: BlockType,
    pub label: String,
    pub description: String,
    pub property_count: usize,
}

/// Where a palette click puts the new block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Start,
    End,
    /// Right below the selected block, or at the end with no selection
    AfterSelection,
    At(usize),
}

/// Lists the registry's block types and turns a pick into an insert intent
pub struct Palette;

impl Palette {
    /// Entries in registry order
    pub fn entries(registry: &Registry) -> Vec<PaletteEntry> {
        registry
            .schemas()
            .map(|schema| PaletteEntry {
                block_type: schema.block_type.clone(),
                label: if schema.label.is_empty() {
                    schema.block_type.to_string()
                } else {
                    schema.label.clone()
                },
                description: schema.description.clone(),
                property_count: schema.properties.len(),
            })
            .collect()
    }

    pub fn insert_intent(block_type: &BlockType, position: InsertPosition, snapshot: &DocumentSnapshot) -> Intent {
        let index = match position {
            InsertPosition::Start => 0,
            InsertPosition::End => snapshot.len(),
            InsertPosition::AfterSelection => snapshot
                .selected
                .as_ref()
                .and_then(|id| snapshot.index_of(id))
                .map(|i| i + 1)
                .unwrap_or_else(|| snapshot.len()),
            InsertPosition::At(i) => i.min(snapshot.len()),
        };

        Intent::InsertBlock {
            block_type: block_type.clone(),
            index,
        }
    }
}
