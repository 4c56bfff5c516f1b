//! # Document Store
//!
//! Sole owner and mutator of the [`Document`]. Render surfaces and the
//! autosave coordinator only ever see [`DocumentSnapshot`]s, published on a
//! `watch` channel after every change.
//!
//! Every operation validates completely before touching the document, so a
//! rejected call leaves it exactly as it was.

use crate::autosave::{SaveEvent, SaveReport};
use crate::block::Block;
use crate::document::{Document, DocumentSnapshot, SaveStatus};
use crate::errors::EditorError;
use crate::ids::{BlockId, DocumentId, IdGenerator};
use crate::intents::{Intent, IntentOutcome};
use blockwright_schema::{BlockType, PropertyValue, Registry};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

pub struct DocumentStore {
    registry: Arc<Registry>,
    doc: Document,
    ids: IdGenerator,
    publisher: watch::Sender<DocumentSnapshot>,
}

impl DocumentStore {
    pub fn new(registry: Arc<Registry>, doc: Document) -> Self {
        let ids = IdGenerator::resume(doc.id(), doc.blocks().iter().map(|b| &b.id));
        let (publisher, _) = watch::channel(doc.snapshot());
        Self {
            registry,
            doc,
            ids,
            publisher,
        }
    }

    /// Store over a fresh, empty document
    pub fn empty(registry: Arc<Registry>, id: DocumentId) -> Self {
        Self::new(registry, Document::new(id))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.doc.snapshot()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<DocumentSnapshot> {
        self.publisher.subscribe()
    }

    fn publish(&self) {
        #[cfg(debug_assertions)]
        self.doc.assert_invariants();

        self.publisher.send_replace(self.doc.snapshot());
    }

    fn require_index(&self, id: &BlockId) -> Result<usize, EditorError> {
        self.doc
            .index_of(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))
    }

    /// Insert a block with registry defaults at `at_index` (clamped) and select it
    pub fn insert_block(&mut self, block_type: &BlockType, at_index: usize) -> Result<BlockId, EditorError> {
        let properties = self.registry.default_properties(block_type).map_err(|e| {
            tracing::error!(block_type = %block_type, "Insert of unregistered block type ignored");
            EditorError::from(e)
        })?;

        let index = at_index.min(self.doc.len());
        let id = self.ids.next_id();
        let block = Block::new(id.clone(), block_type.clone(), index, properties);

        self.doc.blocks_mut().insert(index, Arc::new(block));
        self.doc.renumber();
        self.doc.set_selected(Some(id.clone()));
        self.doc.commit();
        self.publish();

        tracing::debug!(block_id = %id, block_type = %block_type, index, version = self.doc.version(), "Block inserted");
        Ok(id)
    }

    pub fn delete_block(&mut self, id: &BlockId) -> Result<(), EditorError> {
        let index = self.require_index(id)?;

        self.doc.blocks_mut().remove(index);
        self.doc.renumber();
        if self.doc.selected() == Some(id) {
            self.doc.set_selected(None);
        }
        self.doc.commit();
        self.publish();

        tracing::debug!(block_id = %id, version = self.doc.version(), "Block deleted");
        Ok(())
    }

    /// Move a block to `to_index`. Returns false when it was already there.
    pub fn reorder_block(&mut self, id: &BlockId, to_index: usize) -> Result<bool, EditorError> {
        let from = self.require_index(id)?;
        let len = self.doc.len();
        if to_index >= len {
            return Err(EditorError::IndexOutOfRange { index: to_index, len });
        }
        if from == to_index {
            return Ok(false);
        }

        let blocks = self.doc.blocks_mut();
        let block = blocks.remove(from);
        blocks.insert(to_index, block);
        self.doc.renumber();
        self.doc.commit();
        self.publish();

        tracing::debug!(block_id = %id, from, to = to_index, version = self.doc.version(), "Block reordered");
        Ok(true)
    }

    /// Set one property. Returns false when the value was already current.
    pub fn update_property(&mut self, id: &BlockId, key: &str, value: PropertyValue) -> Result<bool, EditorError> {
        let index = self.require_index(id)?;
        let current = &self.doc.blocks()[index];

        if let Err(e) = self.registry.validate(&current.block_type, key, &value) {
            tracing::debug!(block_id = %id, key, error = %e, "Property update rejected");
            return Err(e.into());
        }
        if current.properties.get(key) == Some(&value) {
            return Ok(false);
        }

        let block = Arc::make_mut(&mut self.doc.blocks_mut()[index]);
        block.properties.insert(key.to_string(), value);
        block.updated_at = Utc::now();
        self.doc.commit();
        self.publish();

        tracing::debug!(block_id = %id, key, version = self.doc.version(), "Property updated");
        Ok(true)
    }

    /// Change the selection. Selection is not content and never bumps the version.
    pub fn select_block(&mut self, id: Option<&BlockId>) -> Result<(), EditorError> {
        if let Some(id) = id {
            self.require_index(id)?;
        }
        if self.doc.selected() == id {
            return Ok(());
        }

        self.doc.set_selected(id.cloned());
        self.publish();
        Ok(())
    }

    /// Apply an intent from one of the render surfaces
    pub fn dispatch(&mut self, intent: Intent) -> Result<IntentOutcome, EditorError> {
        let before = self.doc.version();
        let mut inserted = None;

        let changed = match &intent {
            Intent::InsertBlock { block_type, index } => {
                inserted = Some(self.insert_block(block_type, *index)?);
                true
            }
            Intent::DeleteBlock { id } => {
                self.delete_block(id)?;
                true
            }
            Intent::ReorderBlock { id, to_index } => self.reorder_block(id, *to_index)?,
            Intent::UpdateProperty { id, key, value } => self.update_property(id, key, value.clone())?,
            Intent::SelectBlock { id } => {
                let previous = self.doc.selected().cloned();
                self.select_block(id.as_ref())?;
                previous.as_ref() != id.as_ref()
            }
        };

        debug_assert_eq!(self.doc.version() - before, u64::from(changed && intent.is_content_change()));
        Ok(IntentOutcome {
            version: self.doc.version(),
            changed,
            inserted,
        })
    }

    /// Fold an autosave report into the document.
    ///
    /// Reports for another document are ignored. A report about a version
    /// that newer edits have superseded only advances `persisted_version`;
    /// it never clears `dirty` or overwrites the pending status. Conflicts
    /// always surface. Returns true if the report was applied.
    pub fn apply_save_report(&mut self, report: &SaveReport) -> bool {
        if &report.document_id != self.doc.id() {
            tracing::warn!(
                document_id = %report.document_id,
                current = %self.doc.id(),
                "Ignoring save report for another document"
            );
            return false;
        }

        let current = report.version == self.doc.version();

        match &report.event {
            SaveEvent::Started => {
                if current {
                    self.doc.set_save_status(SaveStatus::Saving);
                }
            }
            SaveEvent::Saved { persisted_version } => {
                self.doc.mark_persisted(*persisted_version);
                if current {
                    self.doc.mark_clean();
                    self.doc.set_save_status(SaveStatus::Saved);
                }
            }
            SaveEvent::Failed { attempt, will_retry, .. } => {
                if current {
                    self.doc.set_save_status(SaveStatus::Error {
                        attempt: *attempt,
                        will_retry: *will_retry,
                    });
                }
            }
            SaveEvent::Conflict { remote_version } => {
                self.doc.set_save_status(SaveStatus::Conflict {
                    remote_version: *remote_version,
                });
            }
        }

        self.publish();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DocumentStore {
        DocumentStore::empty(Arc::new(Registry::builtin()), DocumentId::from("page"))
    }

    fn heading() -> BlockType {
        BlockType::from("heading")
    }

    fn paragraph() -> BlockType {
        BlockType::from("paragraph")
    }

    fn ids(store: &DocumentStore) -> Vec<BlockId> {
        store.document().blocks().iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_insert_heading_into_empty_document() {
        let mut store = store();
        let id = store.insert_block(&heading(), 0).unwrap();

        let doc = store.document();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.blocks()[0].order, 0);
        assert_eq!(
            doc.blocks()[0].properties,
            store.registry().default_properties(&heading()).unwrap()
        );
        assert_eq!(doc.selected(), Some(&id));
        assert_eq!(doc.version(), 1);
        assert!(doc.is_dirty());
        assert_eq!(doc.save_status(), SaveStatus::Pending);
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let b = store.insert_block(&paragraph(), 99).unwrap();
        let c = store.insert_block(&paragraph(), 1).unwrap();

        assert_eq!(ids(&store), vec![a, c, b]);
        let orders: Vec<usize> = store.document().blocks().iter().map(|b| b.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_insert_unknown_type_is_noop() {
        let mut store = store();
        let err = store.insert_block(&BlockType::from("carousel"), 0).unwrap_err();
        assert!(matches!(err, EditorError::UnknownBlockType(_)));
        assert_eq!(store.document().version(), 0);
        assert!(store.document().is_empty());
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let b = store.insert_block(&paragraph(), 1).unwrap();
        assert_eq!(store.document().selected(), Some(&b));

        store.delete_block(&b).unwrap();
        assert!(store.document().selected().is_none());
        assert_eq!(ids(&store), vec![a]);
        assert_eq!(store.document().version(), 3);
    }

    #[test]
    fn test_delete_other_keeps_selection() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let b = store.insert_block(&paragraph(), 1).unwrap();

        store.delete_block(&a).unwrap();
        assert_eq!(store.document().selected(), Some(&b));
        assert_eq!(store.document().blocks()[0].order, 0);
    }

    #[test]
    fn test_delete_missing_block() {
        let mut store = store();
        let err = store.delete_block(&BlockId::from("nope")).unwrap_err();
        assert!(matches!(err, EditorError::BlockNotFound(_)));
        assert_eq!(store.document().version(), 0);
    }

    #[test]
    fn test_reorder() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let b = store.insert_block(&paragraph(), 1).unwrap();
        let c = store.insert_block(&paragraph(), 2).unwrap();

        assert!(store.reorder_block(&a, 2).unwrap());
        assert_eq!(ids(&store), vec![b.clone(), c.clone(), a.clone()]);
        assert_eq!(store.document().version(), 4);

        assert!(store.reorder_block(&a, 0).unwrap());
        assert_eq!(ids(&store), vec![a, b, c]);
    }

    #[test]
    fn test_reorder_to_same_index_is_noop() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        store.insert_block(&paragraph(), 1).unwrap();
        let before = store.snapshot();

        assert!(!store.reorder_block(&a, 0).unwrap());
        assert_eq!(store.document().version(), before.version);
        assert!(store.snapshot().shares_blocks_with(&before));
    }

    #[test]
    fn test_reorder_out_of_range() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let err = store.reorder_block(&a, 1).unwrap_err();
        assert!(matches!(err, EditorError::IndexOutOfRange { index: 1, len: 1 }));
    }

    #[test]
    fn test_update_property() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();

        assert!(store.update_property(&a, "text", "Welcome".into()).unwrap());
        let block = store.document().block(&a).unwrap();
        assert_eq!(block.property("text"), Some(&PropertyValue::from("Welcome")));
        assert_eq!(store.document().version(), 2);
    }

    #[test]
    fn test_update_same_value_is_noop() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        assert!(!store.update_property(&a, "text", "Heading".into()).unwrap());
        assert_eq!(store.document().version(), 1);
    }

    #[test]
    fn test_invalid_update_leaves_document_unchanged() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let before = store.snapshot();

        let err = store
            .update_property(&a, "level", PropertyValue::Number(12.0))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidPropertyValue(_)));

        let err = store.update_property(&a, "color", "red".into()).unwrap_err();
        assert!(matches!(err, EditorError::InvalidPropertyValue(_)));

        let after = store.snapshot();
        assert_eq!(after.version, before.version);
        assert!(after.shares_blocks_with(&before));
    }

    #[test]
    fn test_select_does_not_bump_version() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        store.select_block(None).unwrap();
        assert!(store.document().selected().is_none());

        store.select_block(Some(&a)).unwrap();
        assert_eq!(store.document().selected(), Some(&a));
        assert_eq!(store.document().version(), 1);

        let err = store.select_block(Some(&BlockId::from("nope"))).unwrap_err();
        assert!(matches!(err, EditorError::BlockNotFound(_)));
        assert_eq!(store.document().selected(), Some(&a));
    }

    #[test]
    fn test_dispatch_outcome() {
        let mut store = store();
        let outcome = store
            .dispatch(Intent::InsertBlock {
                block_type: heading(),
                index: 0,
            })
            .unwrap();
        let id = outcome.inserted.clone().unwrap();
        assert_eq!(outcome.version, 1);
        assert!(outcome.changed);

        let outcome = store
            .dispatch(Intent::ReorderBlock {
                id: id.clone(),
                to_index: 0,
            })
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.version, 1);

        let outcome = store.dispatch(Intent::SelectBlock { id: None }).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.version, 1);
    }

    #[test]
    fn test_subscribers_see_every_commit() {
        let mut store = store();
        let mut rx = store.subscribe();
        assert_eq!(rx.borrow_and_update().version, 0);

        store.insert_block(&heading(), 0).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().version, 1);
    }

    fn report(store: &DocumentStore, version: u64, event: SaveEvent) -> SaveReport {
        SaveReport {
            document_id: store.document().id().clone(),
            version,
            event,
        }
    }

    #[test]
    fn test_saved_report_clears_dirty() {
        let mut store = store();
        store.insert_block(&heading(), 0).unwrap();

        store.apply_save_report(&report(&store, 1, SaveEvent::Started));
        assert_eq!(store.document().save_status(), SaveStatus::Saving);

        store.apply_save_report(&report(&store, 1, SaveEvent::Saved { persisted_version: 1 }));
        assert!(!store.document().is_dirty());
        assert_eq!(store.document().save_status(), SaveStatus::Saved);
        assert_eq!(store.document().persisted_version(), 1);
    }

    #[test]
    fn test_stale_saved_report_keeps_dirty() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        store.update_property(&a, "text", "Newer".into()).unwrap();

        store.apply_save_report(&report(&store, 1, SaveEvent::Saved { persisted_version: 1 }));
        assert!(store.document().is_dirty());
        assert_eq!(store.document().save_status(), SaveStatus::Pending);
        assert_eq!(store.document().persisted_version(), 1);
    }

    #[test]
    fn test_failed_report_retains_dirty() {
        let mut store = store();
        store.insert_block(&heading(), 0).unwrap();

        store.apply_save_report(&report(
            &store,
            1,
            SaveEvent::Failed {
                attempt: 1,
                will_retry: true,
                message: "503".to_string(),
            },
        ));
        assert!(store.document().is_dirty());
        assert_eq!(
            store.document().save_status(),
            SaveStatus::Error {
                attempt: 1,
                will_retry: true
            }
        );
    }

    #[test]
    fn test_conflict_report_keeps_blocks_and_survives_edits() {
        let mut store = store();
        let a = store.insert_block(&heading(), 0).unwrap();
        let before = store.snapshot();

        store.apply_save_report(&report(&store, 1, SaveEvent::Conflict { remote_version: 5 }));
        assert_eq!(store.document().save_status(), SaveStatus::Conflict { remote_version: 5 });
        assert!(store.snapshot().shares_blocks_with(&before));

        store.update_property(&a, "text", "Still editing".into()).unwrap();
        assert_eq!(store.document().save_status(), SaveStatus::Conflict { remote_version: 5 });
    }

    #[test]
    fn test_report_for_other_document_ignored() {
        let mut store = store();
        store.insert_block(&heading(), 0).unwrap();
        let stray = SaveReport {
            document_id: DocumentId::from("other"),
            version: 1,
            event: SaveEvent::Saved { persisted_version: 1 },
        };
        assert!(!store.apply_save_report(&stray));
        assert!(store.document().is_dirty());
    }
}
