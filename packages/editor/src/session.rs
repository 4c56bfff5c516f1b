//! # Editor Session
//!
//! One mounted editor: the store for a single document, its autosave
//! coordinator and the transient state of the render surfaces.
//!
//! ## Lifecycle
//!
//! ```text
//! mount ──▶ dispatch / pump ... ──▶ on_back ──▶ teardown
//!                 │
//!                 └─ Conflict ──▶ reload_after_conflict (remount, local edits discarded)
//! ```
//!
//! Save reports are folded into the store only by [`EditorSession::pump`] (or
//! [`EditorSession::next_report`]), so the store is never touched from the
//! coordinator task.

use crate::autosave::{AutosaveCoordinator, AutosaveHandle, FlushOutcome, SaveReport, TeardownMode};
use crate::config::AutosaveConfig;
use crate::document::{Document, DocumentSnapshot, SaveStatus};
use crate::errors::EditorError;
use crate::ids::{BlockId, DocumentId};
use crate::intents::{Intent, IntentOutcome};
use crate::persistence::{LoadError, PersistenceApi};
use crate::registry_source::RegistrySource;
use crate::store::DocumentStore;
use crate::surfaces::{Canvas, CanvasItem, InsertPosition, Inspector, InspectorPanel, Palette, PaletteEntry};
use blockwright_schema::{BlockType, Registry};
use std::sync::Arc;

/// Called by [`EditorSession::on_back`] once pending edits are flushed
pub type ExitHook = Box<dyn FnMut() + Send>;

pub struct EditorSession {
    store: DocumentStore,
    persistence: Arc<dyn PersistenceApi>,
    config: AutosaveConfig,
    autosave: Option<AutosaveHandle>,
    canvas: Canvas,
    inspector: Inspector,
    exit_hook: Option<ExitHook>,
}

impl EditorSession {
    /// Load the registry and the document, then start autosave.
    ///
    /// A registry failure aborts the mount. A document the backend has never
    /// seen starts empty at version 0.
    pub async fn mount(
        document_id: DocumentId,
        registry_source: &dyn RegistrySource,
        persistence: Arc<dyn PersistenceApi>,
        config: AutosaveConfig,
    ) -> Result<Self, EditorError> {
        let registry = registry_source.load().await.map_err(|e| {
            tracing::error!(error = %e, "Editor mount failed");
            match e {
                EditorError::RegistryLoad(_) => e,
                other => EditorError::RegistryLoad(other.to_string()),
            }
        })?;
        let registry = Arc::new(registry);

        let doc = load_document(&registry, persistence.as_ref(), &document_id).await?;
        let store = DocumentStore::new(registry, doc);
        let autosave = AutosaveCoordinator::spawn(Arc::clone(&persistence), config.clone(), store.subscribe());

        tracing::info!(
            document_id = %document_id,
            version = store.document().version(),
            blocks = store.document().len(),
            "Editor mounted"
        );

        Ok(Self {
            store,
            persistence,
            config,
            autosave: Some(autosave),
            canvas: Canvas::new(),
            inspector: Inspector::new(),
            exit_hook: None,
        })
    }

    pub fn with_exit_hook(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.exit_hook = Some(Box::new(hook));
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        self.store.registry()
    }

    pub fn document_id(&self) -> &DocumentId {
        self.store.document().id()
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.store.snapshot()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.store.document().save_status()
    }

    fn autosave(&self) -> Result<&AutosaveHandle, EditorError> {
        self.autosave.as_ref().ok_or(EditorError::AutosaveStopped)
    }

    /// Apply an intent. Rejections are logged and returned; the document is
    /// left untouched.
    pub fn dispatch(&mut self, intent: Intent) -> Result<IntentOutcome, EditorError> {
        let name = intent.name();
        self.store.dispatch(intent).map_err(|e| {
            if e.is_local() {
                tracing::warn!(intent = name, error = %e, "Intent rejected");
            } else {
                tracing::error!(intent = name, error = %e, "Intent failed");
            }
            e
        })
    }

    /// Apply every buffered save report. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(report) = self.autosave.as_mut().and_then(|a| a.try_report()) {
            if self.store.apply_save_report(&report) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next save report and apply it
    pub async fn next_report(&mut self) -> Option<SaveReport> {
        let report = self.autosave.as_mut()?.next_report().await?;
        self.store.apply_save_report(&report);
        Some(report)
    }

    // ── Palette ──────────────────────────────────────────────────────────

    pub fn palette(&self) -> Vec<PaletteEntry> {
        Palette::entries(self.store.registry())
    }

    pub fn insert_from_palette(
        &mut self,
        block_type: &BlockType,
        position: InsertPosition,
    ) -> Result<IntentOutcome, EditorError> {
        let intent = Palette::insert_intent(block_type, position, &self.store.snapshot());
        self.dispatch(intent)
    }

    // ── Canvas ───────────────────────────────────────────────────────────

    pub fn render_canvas(&mut self) -> Vec<CanvasItem> {
        let snapshot = self.store.snapshot();
        self.canvas.render(&snapshot, self.store.registry())
    }

    pub fn click(&mut self, id: &BlockId) -> Result<IntentOutcome, EditorError> {
        let intent = self.canvas.click(id);
        self.dispatch(intent)
    }

    pub fn clear_selection(&mut self) -> Result<IntentOutcome, EditorError> {
        let intent = self.canvas.clear_selection();
        self.dispatch(intent)
    }

    pub fn delete(&mut self, id: &BlockId) -> Result<IntentOutcome, EditorError> {
        let intent = self.canvas.delete(id);
        self.dispatch(intent)
    }

    pub fn begin_drag(&mut self, id: &BlockId) -> bool {
        let snapshot = self.store.snapshot();
        self.canvas.begin_drag(&snapshot, id)
    }

    pub fn drag_over(&mut self, index: usize) {
        let snapshot = self.store.snapshot();
        self.canvas.drag_over(&snapshot, index);
    }

    /// Finish a drag; `None` when the block was dropped where it was
    pub fn drop_drag(&mut self) -> Result<Option<IntentOutcome>, EditorError> {
        let snapshot = self.store.snapshot();
        self.canvas.drop(&snapshot).map(|intent| self.dispatch(intent)).transpose()
    }

    pub fn cancel_drag(&mut self) {
        self.canvas.cancel();
    }

    // ── Inspector ────────────────────────────────────────────────────────

    pub fn render_inspector(&mut self) -> Option<InspectorPanel> {
        let snapshot = self.store.snapshot();
        self.inspector.render(&snapshot, self.store.registry())
    }

    /// Submit raw input for a property of the selected block. Invalid input
    /// stays in the inspector as a draft and returns `Ok(None)`.
    pub fn edit_property(&mut self, key: &str, raw: &str) -> Result<Option<IntentOutcome>, EditorError> {
        let snapshot = self.store.snapshot();
        self.inspector
            .edit(&snapshot, self.store.registry(), key, raw)
            .map(|intent| self.dispatch(intent))
            .transpose()
    }

    /// Drop rejected input for `key`, showing the stored value again
    pub fn revert_property(&mut self, key: &str) -> bool {
        self.inspector.revert(key)
    }

    /// Whether the inspector holds input that never reached the document
    pub fn has_uncommitted_input(&self) -> bool {
        self.inspector.has_drafts()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Save now instead of waiting for the debounce window
    pub fn flush(&self) -> Result<(), EditorError> {
        self.autosave()?.flush()
    }

    /// Flush pending edits, then hand control back to the host.
    ///
    /// The exit hook runs whatever the flush outcome; the outcome is
    /// returned so the host can warn about unsaved work.
    pub async fn on_back(&mut self) -> Result<FlushOutcome, EditorError> {
        let outcome = match self.autosave() {
            Ok(autosave) => autosave.flush_and_wait().await,
            Err(e) => Err(e),
        };
        self.pump();

        match &outcome {
            Ok(FlushOutcome::Clean) | Ok(FlushOutcome::Saved { .. }) => {}
            Ok(other) => tracing::warn!(outcome = ?other, "Leaving editor with unsaved changes"),
            Err(e) => tracing::warn!(error = %e, "Leaving editor without flushing"),
        }

        if let Some(hook) = self.exit_hook.as_mut() {
            hook();
        }
        outcome
    }

    /// Resolve a conflict by discarding local state and remounting from the
    /// backend's current version.
    pub async fn reload_after_conflict(&mut self) -> Result<(), EditorError> {
        let discarded = self.store.document().version();
        if let Some(autosave) = self.autosave.take() {
            autosave.shutdown(TeardownMode::Abandon).await;
        }

        let registry = Arc::clone(self.store.registry());
        let document_id = self.document_id().clone();
        let doc = load_document(&registry, self.persistence.as_ref(), &document_id).await?;

        tracing::info!(
            document_id = %document_id,
            discarded_version = discarded,
            version = doc.version(),
            "Reloaded document after conflict"
        );

        self.store = DocumentStore::new(registry, doc);
        self.autosave = Some(AutosaveCoordinator::spawn(
            Arc::clone(&self.persistence),
            self.config.clone(),
            self.store.subscribe(),
        ));
        self.canvas = Canvas::new();
        self.inspector = Inspector::new();
        Ok(())
    }

    /// Stop autosave and return the final snapshot.
    ///
    /// Pending debounce timers are cancelled. With `Drain`, a save already in
    /// flight finishes and its result is applied first.
    pub async fn teardown(mut self, mode: TeardownMode) -> DocumentSnapshot {
        self.pump();
        if let Some(autosave) = self.autosave.take() {
            for report in autosave.shutdown(mode).await {
                self.store.apply_save_report(&report);
            }
        }

        let snapshot = self.store.snapshot();
        tracing::info!(
            document_id = %snapshot.id,
            version = snapshot.version,
            dirty = snapshot.dirty,
            status = snapshot.save_status.label(),
            "Editor torn down"
        );
        snapshot
    }
}

async fn load_document(
    registry: &Registry,
    persistence: &dyn PersistenceApi,
    document_id: &DocumentId,
) -> Result<Document, EditorError> {
    match persistence.load(document_id).await {
        Ok(persisted) => {
            let (doc, repaired) = Document::from_persisted(persisted, registry);
            if repaired {
                tracing::info!(document_id = %document_id, "Stored document was repaired on load");
            }
            Ok(doc)
        }
        Err(LoadError::NotFound(_)) => {
            tracing::debug!(document_id = %document_id, "New document");
            Ok(Document::new(document_id.clone()))
        }
        Err(source) => Err(EditorError::Load {
            document_id: document_id.clone(),
            source,
        }),
    }
}
