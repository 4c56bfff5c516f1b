use crate::document::DocumentSnapshot;
use crate::ids::BlockId;
use crate::intents::Intent;
use blockwright_schema::{BlockType, PropertyKind, Registry};

const SUMMARY_CHARS: usize = 80;

/// One rendered block
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasItem {
    pub id: BlockId,
    pub block_type: BlockType,
    pub label: String,
    pub order: usize,
    pub selected: bool,
    pub summary: Option<String>,

    /// Block is being dragged
    pub dragging: bool,

    /// Block sits where the drag would land
    pub drop_target: bool,
}

/// In-progress drag. Lives only on the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub block_id: BlockId,
    pub from_index: usize,
    pub over_index: usize,
}

/// Ordered block list with selection and drag-to-reorder
#[derive(Debug, Default)]
pub struct Canvas {
    drag: Option<DragState>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Drop a drag whose block no longer exists
    fn sync(&mut self, snapshot: &DocumentSnapshot) {
        if let Some(drag) = &self.drag {
            if snapshot.index_of(&drag.block_id).is_none() {
                tracing::debug!(block_id = %drag.block_id, "Dragged block disappeared, cancelling drag");
                self.drag = None;
            }
        }
    }

    pub fn render(&mut self, snapshot: &DocumentSnapshot, registry: &Registry) -> Vec<CanvasItem> {
        self.sync(snapshot);

        snapshot
            .blocks()
            .iter()
            .map(|block| {
                let schema = registry.schema(&block.block_type).ok();
                let label = schema
                    .map(|s| s.label.clone())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| block.block_type.to_string());
                let keys: Vec<&str> = schema
                    .map(|s| {
                        s.properties
                            .iter()
                            .filter(|p| matches!(p.kind, PropertyKind::Text | PropertyKind::RichText))
                            .map(|p| p.key.as_str())
                            .collect()
                    })
                    .unwrap_or_default();

                let dragging = self.drag.as_ref().is_some_and(|d| d.block_id == block.id);
                let drop_target = self
                    .drag
                    .as_ref()
                    .is_some_and(|d| d.over_index == block.order && d.over_index != d.from_index);

                CanvasItem {
                    id: block.id.clone(),
                    block_type: block.block_type.clone(),
                    label,
                    order: block.order,
                    selected: snapshot.selected.as_ref() == Some(&block.id),
                    summary: block.summary(&keys).map(|s| truncate(&s, SUMMARY_CHARS)),
                    dragging,
                    drop_target,
                }
            })
            .collect()
    }

    pub fn click(&self, id: &BlockId) -> Intent {
        Intent::SelectBlock { id: Some(id.clone()) }
    }

    pub fn clear_selection(&self) -> Intent {
        Intent::SelectBlock { id: None }
    }

    pub fn delete(&self, id: &BlockId) -> Intent {
        Intent::DeleteBlock { id: id.clone() }
    }

    /// Start dragging `id`. Returns false if the block is not in the snapshot.
    pub fn begin_drag(&mut self, snapshot: &DocumentSnapshot, id: &BlockId) -> bool {
        match snapshot.index_of(id) {
            Some(index) => {
                self.drag = Some(DragState {
                    block_id: id.clone(),
                    from_index: index,
                    over_index: index,
                });
                true
            }
            None => false,
        }
    }

    /// Move the drop marker; the index is clamped to the last slot
    pub fn drag_over(&mut self, snapshot: &DocumentSnapshot, index: usize) {
        self.sync(snapshot);
        let last = snapshot.len().saturating_sub(1);
        if let Some(drag) = &mut self.drag {
            drag.over_index = index.min(last);
        }
    }

    /// Finish the drag. Yields a reorder intent unless the block would stay put.
    pub fn drop(&mut self, snapshot: &DocumentSnapshot) -> Option<Intent> {
        self.sync(snapshot);
        let drag = self.drag.take()?;
        let current = snapshot.index_of(&drag.block_id)?;

        (drag.over_index != current).then(|| Intent::ReorderBlock {
            id: drag.block_id,
            to_index: drag.over_index,
        })
    }

    pub fn cancel(&mut self) {
        self.drag = None;
    }
}

fn truncate(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        return line.to_string();
    }
    let mut out: String = line.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
