//! # Document
//!
//! In-memory state of one editable page: ordered blocks, selection,
//! version and save tracking.
//!
//! ## Invariants
//!
//! - `blocks` is sorted by `order`, and `order` equals the block's index
//! - the selected block, if any, exists
//! - `version` grows by one per committed mutation and never goes back
//! - every block's property keys are exactly its schema's keys
//!
//! Only [`crate::DocumentStore`] mutates a `Document`. Everyone else reads a
//! [`DocumentSnapshot`], which shares the block list copy-on-write so taking
//! one is O(1).

use crate::block::Block;
use crate::ids::{BlockId, DocumentId};
use crate::persistence::PersistedDocument;
use blockwright_schema::Registry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persistence state shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum SaveStatus {
    /// Nothing to save since mount
    Idle,
    /// Local edits waiting for the debounce window
    Pending,
    Saving,
    Saved,
    /// Last attempt failed; `will_retry` is false once retries are exhausted
    Error { attempt: u32, will_retry: bool },
    /// Backend holds a newer version written by someone else
    Conflict { remote_version: u64 },
}

impl SaveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Pending => "pending",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error { .. } => "error",
            SaveStatus::Conflict { .. } => "conflict",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    blocks: Arc<Vec<Arc<Block>>>,
    version: u64,
    persisted_version: u64,
    selected: Option<BlockId>,
    dirty: bool,
    save_status: SaveStatus,
}

impl Document {
    /// Empty document, version 0
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            blocks: Arc::new(Vec::new()),
            version: 0,
            persisted_version: 0,
            selected: None,
            dirty: false,
            save_status: SaveStatus::Idle,
        }
    }

    /// Rebuild a document from persisted state.
    ///
    /// Blocks are re-ranked by their stored order and their properties are
    /// fitted onto the current schema. Blocks of unregistered types are
    /// skipped with a warning; the returned flag is true if anything had to
    /// be repaired, in which case the document starts dirty.
    pub fn from_persisted(persisted: PersistedDocument, registry: &Registry) -> (Self, bool) {
        let mut repaired = false;
        let mut stored = persisted.blocks;
        stored.sort_by_key(|b| b.order);

        let mut blocks = Vec::with_capacity(stored.len());
        let mut seen = std::collections::HashSet::new();

        for mut block in stored {
            if !seen.insert(block.id.clone()) {
                tracing::warn!(block_id = %block.id, "Dropping duplicate block id");
                repaired = true;
                continue;
            }

            match registry.reconcile(&block.block_type, &block.properties) {
                Ok(reconciled) => {
                    if !reconciled.is_clean() {
                        tracing::warn!(
                            block_id = %block.id,
                            defaulted = ?reconciled.defaulted,
                            dropped = ?reconciled.dropped,
                            "Block properties did not match schema"
                        );
                        repaired = true;
                    }
                    block.properties = reconciled.properties;
                    blocks.push(Arc::new(block));
                }
                Err(e) => {
                    tracing::warn!(block_id = %block.id, error = %e, "Skipping block");
                    repaired = true;
                }
            }
        }

        let mut doc = Self {
            id: persisted.id,
            blocks: Arc::new(blocks),
            version: persisted.version,
            persisted_version: persisted.version,
            selected: None,
            dirty: false,
            save_status: SaveStatus::Idle,
        };

        if doc.renumber() {
            repaired = true;
        }
        // The repair is a local edit of its own and gets saved under a new version.
        if repaired {
            doc.commit();
        }
        (doc, repaired)
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn persisted_version(&self) -> u64 {
        self.persisted_version
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id).map(|b| b.as_ref())
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            id: self.id.clone(),
            blocks: Arc::clone(&self.blocks),
            version: self.version,
            persisted_version: self.persisted_version,
            selected: self.selected.clone(),
            dirty: self.dirty,
            save_status: self.save_status,
        }
    }

    // ── Store-only mutators ──────────────────────────────────────────────

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Arc<Block>> {
        Arc::make_mut(&mut self.blocks)
    }

    pub(crate) fn set_selected(&mut self, id: Option<BlockId>) {
        self.selected = id;
    }

    pub(crate) fn set_save_status(&mut self, status: SaveStatus) {
        self.save_status = status;
    }

    pub(crate) fn mark_persisted(&mut self, version: u64) {
        self.persisted_version = self.persisted_version.max(version);
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Record a committed mutation. A conflict stays surfaced until the
    /// host resolves it.
    pub(crate) fn commit(&mut self) {
        self.version += 1;
        self.dirty = true;
        if !matches!(self.save_status, SaveStatus::Conflict { .. }) {
            self.save_status = SaveStatus::Pending;
        }
    }

    /// Make every `order` equal its index. Returns true if any rank changed.
    pub(crate) fn renumber(&mut self) -> bool {
        let needs_work = self.blocks.iter().enumerate().any(|(i, b)| b.order != i);
        if !needs_work {
            return false;
        }

        for (i, block) in self.blocks_mut().iter_mut().enumerate() {
            if block.order != i {
                Arc::make_mut(block).order = i;
            }
        }
        true
    }

    /// Check the structural invariants, panicking on violation
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn assert_invariants(&self) {
        for (i, block) in self.blocks.iter().enumerate() {
            assert_eq!(block.order, i, "block {} has order {} at index {}", block.id, block.order, i);
        }
        if let Some(selected) = &self.selected {
            assert!(self.index_of(selected).is_some(), "selection {} dangles", selected);
        }
    }
}

/// Immutable view of a document at one version
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    blocks: Arc<Vec<Arc<Block>>>,
    pub version: u64,
    pub persisted_version: u64,
    pub selected: Option<BlockId>,
    pub dirty: bool,
    pub save_status: SaveStatus,
}

impl DocumentSnapshot {
    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id).map(|b| b.as_ref())
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn selected_block(&self) -> Option<&Block> {
        self.selected.as_ref().and_then(|id| self.block(id))
    }

    /// Owned copy of the blocks, as sent to persistence
    pub fn to_blocks(&self) -> Vec<Block> {
        self.blocks.iter().map(|b| Block::clone(b)).collect()
    }

    /// True if both snapshots share the same block list allocation
    pub fn shares_blocks_with(&self, other: &DocumentSnapshot) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks)
    }
}
