//! # Block Schema Registry
//!
//! Read-only catalog of block types, built once at editor startup.
//!
//! Construction checks every schema up front so that every later query can
//! assume a consistent catalog:
//! - block types and property keys are unique
//! - enum properties list at least one option
//! - patterns compile
//! - every default satisfies its own constraints

use crate::builtin;
use crate::error::{SchemaError, SchemaResult, ValidationError};
use crate::types::{BlockSchema, BlockType, PropertyDefinition, PropertyKind, PropertyMap, PropertyValue};
use crate::validate::{check_value, parse_input};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// A schema plus its compiled patterns
#[derive(Debug, Clone)]
struct CompiledSchema {
    schema: BlockSchema,
    patterns: HashMap<String, Regex>,
}

impl CompiledSchema {
    fn compile(schema: BlockSchema) -> SchemaResult<Self> {
        let mut keys = HashSet::new();
        let mut patterns = HashMap::new();

        for def in &schema.properties {
            if def.key.is_empty() {
                return Err(SchemaError::invalid_schema(&schema.block_type, "empty property key"));
            }
            if !keys.insert(def.key.as_str()) {
                return Err(SchemaError::invalid_schema(
                    &schema.block_type,
                    format!("duplicate property `{}`", def.key),
                ));
            }
            if def.kind == PropertyKind::Enum && def.constraints.options.is_empty() {
                return Err(SchemaError::invalid_schema(
                    &schema.block_type,
                    format!("enum property `{}` has no options", def.key),
                ));
            }
            if let Some(pattern) = &def.constraints.pattern {
                let re = Regex::new(pattern).map_err(|e| {
                    SchemaError::invalid_schema(&schema.block_type, format!("pattern for `{}`: {}", def.key, e))
                })?;
                patterns.insert(def.key.clone(), re);
            }

            check_value(def, &def.default, patterns.get(&def.key)).map_err(|e| {
                SchemaError::invalid_schema(&schema.block_type, format!("default rejected: {}", e))
            })?;
        }

        Ok(Self { schema, patterns })
    }

    fn definition(&self, key: &str) -> Result<&PropertyDefinition, ValidationError> {
        self.schema.find(key).ok_or_else(|| ValidationError::UnknownProperty {
            block_type: self.schema.block_type.clone(),
            key: key.to_string(),
        })
    }

    fn check(&self, def: &PropertyDefinition, value: &PropertyValue) -> Result<(), ValidationError> {
        check_value(def, value, self.patterns.get(&def.key))
    }
}

/// Outcome of fitting stored properties onto the current schema
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub properties: PropertyMap,

    /// Keys filled with defaults (missing or invalid)
    pub defaulted: Vec<String>,

    /// Keys dropped because the schema no longer has them
    pub dropped: Vec<String>,
}

impl Reconciled {
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty() && self.dropped.is_empty()
    }
}

/// Catalog of block schemas
#[derive(Debug, Clone)]
pub struct Registry {
    schemas: Vec<CompiledSchema>,
    index: HashMap<BlockType, usize>,
}

impl Registry {
    /// Registry with the built-in block types
    pub fn builtin() -> Self {
        Self::from_schemas(builtin::schemas()).expect("built-in block schemas are valid")
    }

    /// Build a registry, rejecting inconsistent schemas
    pub fn from_schemas(schemas: Vec<BlockSchema>) -> SchemaResult<Self> {
        let mut compiled = Vec::with_capacity(schemas.len());
        let mut index = HashMap::with_capacity(schemas.len());

        for schema in schemas {
            if schema.block_type.as_str().is_empty() {
                return Err(SchemaError::invalid_schema(&schema.block_type, "empty block type"));
            }
            if index.contains_key(&schema.block_type) {
                return Err(SchemaError::invalid_schema(&schema.block_type, "registered twice"));
            }
            index.insert(schema.block_type.clone(), compiled.len());
            compiled.push(CompiledSchema::compile(schema)?);
        }

        Ok(Self { schemas: compiled, index })
    }

    /// Parse a JSON array of block schemas
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schemas: Vec<BlockSchema> = serde_json::from_str(json)?;
        Self::from_schemas(schemas)
    }

    fn compiled(&self, block_type: &BlockType) -> SchemaResult<&CompiledSchema> {
        self.index
            .get(block_type)
            .map(|&i| &self.schemas[i])
            .ok_or_else(|| SchemaError::UnknownBlockType(block_type.clone()))
    }

    /// Full schema for a block type
    pub fn schema(&self, block_type: &BlockType) -> SchemaResult<&BlockSchema> {
        self.compiled(block_type).map(|c| &c.schema)
    }

    /// Ordered property definitions of a block type
    pub fn get_schema(&self, block_type: &BlockType) -> SchemaResult<&[PropertyDefinition]> {
        self.schema(block_type).map(|s| s.properties.as_slice())
    }

    /// Registered types, in registration order
    pub fn list_types(&self) -> Vec<&BlockType> {
        self.schemas.iter().map(|c| &c.schema.block_type).collect()
    }

    pub fn schemas(&self) -> impl Iterator<Item = &BlockSchema> {
        self.schemas.iter().map(|c| &c.schema)
    }

    pub fn contains(&self, block_type: &BlockType) -> bool {
        self.index.contains_key(block_type)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Default value for every property of a block type
    pub fn default_properties(&self, block_type: &BlockType) -> SchemaResult<PropertyMap> {
        let schema = self.schema(block_type)?;
        Ok(schema
            .properties
            .iter()
            .map(|def| (def.key.clone(), def.default.clone()))
            .collect())
    }

    /// Definition of a single property
    pub fn definition(&self, block_type: &BlockType, key: &str) -> SchemaResult<&PropertyDefinition> {
        Ok(self.compiled(block_type)?.definition(key)?)
    }

    /// Check a value for `key` of `block_type`
    pub fn validate(&self, block_type: &BlockType, key: &str, value: &PropertyValue) -> SchemaResult<()> {
        let compiled = self.compiled(block_type)?;
        let def = compiled.definition(key)?;
        compiled.check(def, value)?;
        Ok(())
    }

    /// Parse raw inspector input and validate the result
    pub fn parse_input(&self, block_type: &BlockType, key: &str, raw: &str) -> SchemaResult<PropertyValue> {
        let compiled = self.compiled(block_type)?;
        let def = compiled.definition(key)?;
        let value = parse_input(def, raw)?;
        compiled.check(def, &value)?;
        Ok(value)
    }

    /// Fit stored properties onto the schema.
    ///
    /// Known valid values are kept, missing or invalid ones fall back to the
    /// default, and keys the schema no longer has are dropped.
    pub fn reconcile(&self, block_type: &BlockType, stored: &PropertyMap) -> SchemaResult<Reconciled> {
        let compiled = self.compiled(block_type)?;
        let mut properties = PropertyMap::new();
        let mut defaulted = Vec::new();

        for def in &compiled.schema.properties {
            match stored.get(&def.key) {
                Some(value) if compiled.check(def, value).is_ok() => {
                    properties.insert(def.key.clone(), value.clone());
                }
                _ => {
                    defaulted.push(def.key.clone());
                    properties.insert(def.key.clone(), def.default.clone());
                }
            }
        }

        let dropped = stored
            .keys()
            .filter(|k| compiled.schema.find(k).is_none())
            .cloned()
            .collect();

        Ok(Reconciled {
            properties,
            defaulted,
            dropped,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::builtin();
        let types: Vec<&str> = registry.list_types().iter().map(|t| t.as_str()).collect();
        assert_eq!(types, vec!["heading", "paragraph", "image", "cta", "quote", "divider"]);
    }

    #[test]
    fn test_get_schema_is_ordered() {
        let registry = Registry::builtin();
        let keys: Vec<&str> = registry
            .get_schema(&BlockType::from("heading"))
            .unwrap()
            .iter()
            .map(|d| d.key.as_str())
            .collect();
        assert_eq!(keys, vec!["text", "level", "anchor"]);
    }

    #[test]
    fn test_default_properties() {
        let registry = Registry::builtin();
        let props = registry.default_properties(&BlockType::from("heading")).unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(props["text"], PropertyValue::from("Heading"));
        assert_eq!(props["level"], PropertyValue::Number(2.0));
        assert_eq!(props["anchor"], PropertyValue::from(""));
    }

    #[test]
    fn test_unknown_block_type() {
        let registry = Registry::builtin();
        let err = registry.get_schema(&BlockType::from("carousel")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownBlockType(t) if t.as_str() == "carousel"));
    }

    #[test]
    fn test_validate_unknown_key() {
        let registry = Registry::builtin();
        let err = registry
            .validate(&BlockType::from("heading"), "color", &"red".into())
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Validation(ValidationError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_validate_uses_compiled_pattern() {
        let registry = Registry::builtin();
        let cta = BlockType::from("cta");
        assert!(registry.validate(&cta, "href", &"https://example.com".into()).is_ok());
        assert!(registry.validate(&cta, "href", &"javascript:alert(1)".into()).is_err());
    }

    #[test]
    fn test_parse_input_validates() {
        let registry = Registry::builtin();
        let heading = BlockType::from("heading");
        assert_eq!(
            registry.parse_input(&heading, "level", "3").unwrap(),
            PropertyValue::Number(3.0)
        );
        assert!(registry.parse_input(&heading, "level", "9").is_err());
    }

    #[test]
    fn test_rejects_duplicate_type() {
        let schemas = vec![
            BlockSchema::new("note", "Note"),
            BlockSchema::new("note", "Note again"),
        ];
        assert!(matches!(
            Registry::from_schemas(schemas),
            Err(SchemaError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_default() {
        let schema = BlockSchema::new("note", "Note")
            .property(PropertyDefinition::new("body", PropertyKind::Text, "").required());
        let err = Registry::from_schemas(vec![schema]).unwrap_err();
        assert!(err.to_string().contains("default rejected"));
    }

    #[test]
    fn test_rejects_enum_without_options() {
        let schema = BlockSchema::new("note", "Note")
            .property(PropertyDefinition::new("tone", PropertyKind::Enum, "info"));
        assert!(Registry::from_schemas(vec![schema]).is_err());
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let schema = BlockSchema::new("note", "Note")
            .property(PropertyDefinition::new("slug", PropertyKind::Text, "").pattern("(["));
        assert!(Registry::from_schemas(vec![schema]).is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            { "type": "callout", "label": "Callout", "properties": [
                { "key": "text", "kind": "text", "default": "Note" },
                { "key": "tone", "kind": "enum", "default": "info",
                  "constraints": { "options": ["info", "warning"] } }
            ]}
        ]"#;

        let registry = Registry::from_json(json).unwrap();
        assert_eq!(registry.len(), 1);
        let props = registry.default_properties(&BlockType::from("callout")).unwrap();
        assert_eq!(props["tone"], PropertyValue::from("info"));
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(Registry::from_json("{"), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn test_reconcile() {
        let registry = Registry::builtin();
        let mut stored = PropertyMap::new();
        stored.insert("text".to_string(), "Kept".into());
        stored.insert("level".to_string(), PropertyValue::Number(42.0));
        stored.insert("legacy".to_string(), PropertyValue::Bool(true));

        let result = registry.reconcile(&BlockType::from("heading"), &stored).unwrap();
        assert_eq!(result.properties["text"], PropertyValue::from("Kept"));
        assert_eq!(result.properties["level"], PropertyValue::Number(2.0));
        assert_eq!(result.defaulted, vec!["level".to_string(), "anchor".to_string()]);
        assert_eq!(result.dropped, vec!["legacy".to_string()]);
        assert!(!result.is_clean());
    }
}
