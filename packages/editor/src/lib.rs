//! # Blockwright Editor
//!
//! Editing core for block-based pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: block types, properties, validation │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ store: sole owner of the Document           │
//! │  - Applies intents atomically               │
//! │  - Publishes snapshots on every change      │
//! │  - Folds save reports into save status      │
//! └─────────────────────────────────────────────┘
//!        ↓ snapshots                 ↓ snapshots
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │ surfaces: palette,   │  │ autosave: debounce,  │
//! │ canvas, inspector    │  │ single-flight, retry │
//! │  → intents           │  │  → PersistenceApi    │
//! └──────────────────────┘  └──────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One writer**: only the store mutates the document
//! 2. **Intents in, snapshots out**: surfaces never hold authoritative state
//! 3. **Version as truth**: every content change bumps the version; saves and
//!    their reports are matched by version, never by timing
//! 4. **Conflicts surface, never merge**: local edits are discarded only when
//!    the host asks for a reload
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blockwright_editor::{
//!     AutosaveConfig, BuiltinRegistry, EditorSession, FileBackend, InsertPosition, TeardownMode,
//! };
//!
//! let backend = Arc::new(FileBackend::new(".blockwright"));
//! let mut session = EditorSession::mount("home".into(), &BuiltinRegistry, backend, AutosaveConfig::default()).await?;
//!
//! let outcome = session.insert_from_palette(&"heading".into(), InsertPosition::End)?;
//! session.edit_property("text", "Welcome")?;
//!
//! session.on_back().await?;
//! session.teardown(TeardownMode::Drain).await;
//! ```

mod autosave;
mod block;
mod config;
mod document;
mod errors;
mod ids;
mod intents;
mod persistence;
mod registry_source;
mod session;
mod store;
mod surfaces;

pub use autosave::{AutosaveCoordinator, AutosaveHandle, FlushOutcome, SaveEvent, SaveReport, TeardownMode};
pub use block::Block;
pub use config::AutosaveConfig;
pub use document::{Document, DocumentSnapshot, SaveStatus};
pub use errors::EditorError;
pub use ids::{BlockId, DocumentId, IdGenerator};
pub use intents::{Intent, IntentOutcome};
pub use persistence::{
    FileBackend, LoadError, MemoryBackend, PersistError, PersistedDocument, PersistenceApi, SaveAck, SaveOutcome,
    SaveRequest,
};
pub use registry_source::{BuiltinRegistry, JsonFileRegistry, RegistrySource};
pub use session::{EditorSession, ExitHook};
pub use store::DocumentStore;
pub use surfaces::{Canvas, CanvasItem, DragState, InsertPosition, Inspector, InspectorField, InspectorPanel, Palette, PaletteEntry};

// Re-export schema types for convenience
pub use blockwright_schema::{BlockSchema, BlockType, PropertyDefinition, PropertyKind, PropertyMap, PropertyValue, Registry};
