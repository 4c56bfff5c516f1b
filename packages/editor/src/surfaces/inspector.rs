use crate::document::DocumentSnapshot;
use crate::ids::BlockId;
use crate::intents::Intent;
use blockwright_schema::{BlockType, PropertyKind, PropertyValue, Registry};
use std::collections::BTreeMap;

/// Property form for the selected block
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorPanel {
    pub block_id: BlockId,
    pub block_type: BlockType,
    pub title: String,
    pub fields: Vec<InspectorField>,

    /// True only when every field can commit
    pub commit_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectorField {
    pub key: String,
    pub label: String,
    pub kind: PropertyKind,
    pub required: bool,

    /// Enum choices
    pub options: Vec<String>,

    /// Value stored on the block
    pub value: PropertyValue,

    /// Rejected input still shown to the user
    pub draft: Option<String>,

    pub error: Option<String>,

    /// False while this field's draft or stored value fails validation
    pub commit_enabled: bool,
}

#[derive(Debug, Clone)]
struct Draft {
    raw: String,
    error: String,
}

/// Edits properties of the selected block.
///
/// Input that fails validation is kept as a draft next to its error and
/// never reaches the store. Drafts belong to one selection and are thrown
/// away when it changes.
#[derive(Debug, Default)]
pub struct Inspector {
    block: Option<BlockId>,
    drafts: BTreeMap<String, Draft>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    fn sync(&mut self, snapshot: &DocumentSnapshot) {
        let selected = snapshot.selected_block().map(|b| &b.id);
        if self.block.as_ref() != selected {
            if !self.drafts.is_empty() {
                tracing::debug!(discarded = self.drafts.len(), "Selection changed, discarding inspector drafts");
            }
            self.drafts.clear();
            self.block = selected.cloned();
        }
    }

    pub fn has_drafts(&self) -> bool {
        !self.drafts.is_empty()
    }

    /// `None` when nothing is selected
    pub fn render(&mut self, snapshot: &DocumentSnapshot, registry: &Registry) -> Option<InspectorPanel> {
        self.sync(snapshot);
        let block = snapshot.selected_block()?;
        let schema = registry.schema(&block.block_type).ok()?;

        let fields = schema
            .properties
            .iter()
            .map(|def| {
                let value = block.property(&def.key).cloned().unwrap_or(PropertyValue::Null);
                let (draft, error) = match self.drafts.get(&def.key) {
                    Some(d) => (Some(d.raw.clone()), Some(d.error.clone())),
                    None => (
                        None,
                        registry
                            .validate(&block.block_type, &def.key, &value)
                            .err()
                            .map(|e| e.to_string()),
                    ),
                };
                InspectorField {
                    key: def.key.clone(),
                    label: def.label.clone(),
                    kind: def.kind,
                    required: def.constraints.required,
                    options: def.constraints.options.clone(),
                    value,
                    commit_enabled: error.is_none(),
                    draft,
                    error,
                }
            })
            .collect::<Vec<_>>();

        Some(InspectorPanel {
            block_id: block.id.clone(),
            block_type: block.block_type.clone(),
            title: schema.label.clone(),
            commit_enabled: fields.iter().all(|f| f.commit_enabled),
            fields,
        })
    }

    /// Parse and validate raw input for `key` of the selected block.
    ///
    /// Valid input becomes an update intent and clears the field's draft;
    /// invalid input is kept as a draft with its error and yields nothing.
    pub fn edit(&mut self, snapshot: &DocumentSnapshot, registry: &Registry, key: &str, raw: &str) -> Option<Intent> {
        self.sync(snapshot);
        let block = snapshot.selected_block()?;

        match registry.parse_input(&block.block_type, key, raw) {
            Ok(value) => {
                self.drafts.remove(key);
                Some(Intent::UpdateProperty {
                    id: block.id.clone(),
                    key: key.to_string(),
                    value,
                })
            }
            Err(e) => {
                tracing::debug!(block_id = %block.id, key, error = %e, "Inspector input rejected");
                self.drafts.insert(
                    key.to_string(),
                    Draft {
                        raw: raw.to_string(),
                        error: e.to_string(),
                    },
                );
                None
            }
        }
    }

    /// Throw away the draft for one field, restoring the stored value.
    /// Returns whether there was a draft.
    pub fn revert(&mut self, key: &str) -> bool {
        self.drafts.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DocumentId;
    use crate::store::DocumentStore;
    use std::sync::Arc;

    fn store() -> (DocumentStore, BlockId, BlockId) {
        let mut store = DocumentStore::empty(Arc::new(Registry::builtin()), DocumentId::from("page"));
        let heading = store.insert_block(&BlockType::from("heading"), 0).unwrap();
        let cta = store.insert_block(&BlockType::from("cta"), 1).unwrap();
        store.select_block(Some(&heading)).unwrap();
        (store, heading, cta)
    }

    #[test]
    fn test_nothing_selected() {
        let (mut store, _, _) = store();
        store.select_block(None).unwrap();
        let mut inspector = Inspector::new();
        assert!(inspector.render(&store.snapshot(), store.registry()).is_none());
        assert!(inspector
            .edit(&store.snapshot(), store.registry(), "text", "x")
            .is_none());
    }

    #[test]
    fn test_render_fields_in_schema_order() {
        let (store, heading, _) = store();
        let mut inspector = Inspector::new();
        let panel = inspector.render(&store.snapshot(), store.registry()).unwrap();

        assert_eq!(panel.block_id, heading);
        assert_eq!(panel.title, "Heading");
        let keys: Vec<&str> = panel.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["text", "level", "anchor"]);
        assert_eq!(panel.fields[1].value, PropertyValue::Number(2.0));
        assert!(panel.fields[0].required);
        assert!(panel.commit_enabled);
    }

    #[test]
    fn test_valid_edit_yields_typed_intent() {
        let (store, heading, _) = store();
        let mut inspector = Inspector::new();
        let intent = inspector.edit(&store.snapshot(), store.registry(), "level", "3");
        assert_eq!(
            intent,
            Some(Intent::UpdateProperty {
                id: heading,
                key: "level".to_string(),
                value: PropertyValue::Number(3.0),
            })
        );
    }

    #[test]
    fn test_invalid_edit_kept_as_draft() {
        let (store, _, _) = store();
        let snapshot = store.snapshot();
        let mut inspector = Inspector::new();

        assert!(inspector.edit(&snapshot, store.registry(), "level", "9").is_none());
        let panel = inspector.render(&snapshot, store.registry()).unwrap();
        let level = &panel.fields[1];
        assert_eq!(level.draft.as_deref(), Some("9"));
        assert!(level.error.is_some());
        assert_eq!(level.value, PropertyValue::Number(2.0));
        assert!(!level.commit_enabled);
        assert!(!panel.commit_enabled);

        // Fixing the input clears the draft
        assert!(inspector.edit(&snapshot, store.registry(), "level", "4").is_some());
        let panel = inspector.render(&snapshot, store.registry()).unwrap();
        assert!(panel.fields[1].draft.is_none());
        assert!(panel.commit_enabled);
    }

    #[test]
    fn test_selection_change_discards_drafts() {
        let (mut store, _, cta) = store();
        let mut inspector = Inspector::new();
        inspector.edit(&store.snapshot(), store.registry(), "anchor", "Not An Anchor");
        assert!(inspector.has_drafts());

        store.select_block(Some(&cta)).unwrap();
        let panel = inspector.render(&store.snapshot(), store.registry()).unwrap();
        assert_eq!(panel.block_id, cta);
        assert!(!inspector.has_drafts());
        assert!(panel.commit_enabled);
    }

    #[test]
    fn test_revert_draft() {
        let (store, _, _) = store();
        let mut inspector = Inspector::new();
        inspector.edit(&store.snapshot(), store.registry(), "text", "");
        assert!(inspector.has_drafts());
        assert!(inspector.revert("text"));
        assert!(!inspector.has_drafts());
        assert!(!inspector.revert("text"));
    }

    #[test]
    fn test_commit_enabled_per_field() {
        let (store, heading, _) = store();
        let snapshot = store.snapshot();
        let mut inspector = Inspector::new();

        assert!(inspector.edit(&snapshot, store.registry(), "level", "seven").is_none());
        let panel = inspector.render(&snapshot, store.registry()).unwrap();
        let enabled: Vec<(&str, bool)> = panel
            .fields
            .iter()
            .map(|f| (f.key.as_str(), f.commit_enabled))
            .collect();
        assert_eq!(enabled, vec![("text", true), ("level", false), ("anchor", true)]);
        assert!(!panel.commit_enabled);

        // A passing field still commits next to a failing one
        assert_eq!(
            inspector.edit(&snapshot, store.registry(), "text", "Welcome"),
            Some(Intent::UpdateProperty {
                id: heading,
                key: "text".to_string(),
                value: PropertyValue::from("Welcome"),
            })
        );
        let panel = inspector.render(&snapshot, store.registry()).unwrap();
        assert!(panel.fields[0].commit_enabled);
        assert!(!panel.fields[1].commit_enabled);
    }
}
