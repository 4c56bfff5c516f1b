//! Where the block registry comes from at mount time.
//!
//! Loading happens once per session. Any failure is fatal for the mount:
//! without schemas no block can be rendered or edited.

use crate::errors::EditorError;
use async_trait::async_trait;
use blockwright_schema::Registry;
use std::path::PathBuf;

#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn load(&self) -> Result<Registry, EditorError>;
}

/// The block types shipped with the editor
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinRegistry;

#[async_trait]
impl RegistrySource for BuiltinRegistry {
    async fn load(&self) -> Result<Registry, EditorError> {
        Ok(Registry::builtin())
    }
}

/// JSON array of block schemas on disk
#[derive(Debug, Clone)]
pub struct JsonFileRegistry {
    path: PathBuf,
}

impl JsonFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RegistrySource for JsonFileRegistry {
    async fn load(&self) -> Result<Registry, EditorError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| EditorError::RegistryLoad(format!("{}: {}", self.path.display(), e)))?;

        let registry = Registry::from_json(&content)
            .map_err(|e| EditorError::RegistryLoad(format!("{}: {}", self.path.display(), e)))?;

        tracing::info!(path = %self.path.display(), types = registry.len(), "Loaded block registry");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockwright_schema::BlockType;

    #[tokio::test]
    async fn test_builtin_source() {
        let registry = BuiltinRegistry.load().await.unwrap();
        assert!(registry.contains(&BlockType::from("heading")));
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        std::fs::write(
            &path,
            r#"[{ "type": "note", "label": "Note", "properties": [
                { "key": "text", "kind": "text", "default": "" }
            ]}]"#,
        )
        .unwrap();

        let registry = JsonFileRegistry::new(&path).load().await.unwrap();
        assert_eq!(registry.list_types(), vec![&BlockType::from("note")]);
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonFileRegistry::new(dir.path().join("absent.json"))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::RegistryLoad(_)));
    }

    #[tokio::test]
    async fn test_malformed_registry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileRegistry::new(&path).load().await.unwrap_err();
        assert!(matches!(err, EditorError::RegistryLoad(_)));
    }
}
