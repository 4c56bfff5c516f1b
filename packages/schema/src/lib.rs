//! # Blockwright Schema
//!
//! Static catalog of block types and their editable properties.
//!
//! The registry is pure and read-only: it is built once when the editor
//! starts (from the built-in set or a JSON config) and is shared by the
//! document store, the palette and the inspector.

mod builtin;
mod error;
mod registry;
mod types;
mod validate;

pub use error::{SchemaError, SchemaResult, ValidationError};
pub use registry::{Reconciled, Registry};
pub use types::{
    BlockSchema, BlockType, Constraints, PropertyDefinition, PropertyKind, PropertyMap, PropertyValue,
};
pub use validate::{check_value, parse_input};
