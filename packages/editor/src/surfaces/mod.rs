//! # Render surfaces
//!
//! Palette, canvas and inspector are views over the latest
//! [`DocumentSnapshot`](crate::DocumentSnapshot) and the registry. They never
//! mutate the document; user gestures come back out as [`Intent`](crate::Intent)s
//! for the store to apply.
//!
//! The only state they keep is transient UI state (an in-progress drag,
//! unsubmitted inspector drafts), which is discarded rather than reconciled
//! when the snapshot moves on.

mod canvas;
mod inspector;
mod palette;

pub use canvas::{Canvas, CanvasItem, DragState};
pub use inspector::{Inspector, InspectorField, InspectorPanel};
pub use palette::{InsertPosition, Palette, PaletteEntry};
