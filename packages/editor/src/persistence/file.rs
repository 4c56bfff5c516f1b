//! File-backed persistence: one JSON file per document

use super::{check_save, LoadError, PersistError, PersistedDocument, PersistenceApi, SaveAck, SaveRequest};
use crate::ids::DocumentId;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    /// Serializes read-check-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the stored file. Bytes outside `[A-Za-z0-9_-]` are
    /// percent-encoded, so distinct ids never share a file.
    pub fn path_for(&self, document_id: &DocumentId) -> PathBuf {
        let mut name = String::with_capacity(document_id.as_str().len());
        for byte in document_id.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}.json", name))
    }

    async fn read(&self, document_id: &DocumentId) -> Result<Option<PersistedDocument>, LoadError> {
        let path = self.path_for(document_id);
        let document: PersistedDocument = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| LoadError::Backend(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LoadError::Backend(format!("{}: {}", path.display(), e))),
        };

        if &document.id != document_id {
            return Err(LoadError::Backend(format!(
                "{}: holds document {}, expected {}",
                path.display(),
                document.id,
                document_id
            )));
        }
        Ok(Some(document))
    }
}

#[async_trait]
impl PersistenceApi for FileBackend {
    async fn save(&self, request: SaveRequest) -> Result<SaveAck, PersistError> {
        let _guard = self.write_lock.lock().await;

        let stored = self
            .read(&request.document_id)
            .await
            .map_err(|e| PersistError::Transient(e.to_string()))?;

        if let Some(ack) = check_save(stored.as_ref(), &request)? {
            return Ok(ack);
        }

        let new_version = request.version;
        let path = self.path_for(&request.document_id);
        let document = PersistedDocument {
            id: request.document_id,
            version: new_version,
            blocks: request.blocks,
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| PersistError::Transient(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistError::Transient(e.to_string()))?;

        // Write-then-rename so readers never see a torn file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| PersistError::Transient(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| PersistError::Transient(e.to_string()))?;

        tracing::debug!(path = %path.display(), version = new_version, "Document written");
        Ok(SaveAck { new_version })
    }

    async fn load(&self, document_id: &DocumentId) -> Result<PersistedDocument, LoadError> {
        self.read(document_id)
            .await?
            .ok_or_else(|| LoadError::NotFound(document_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::ids::BlockId;
    use blockwright_schema::{BlockType, Registry};

    fn heading_block() -> Block {
        let props = Registry::builtin()
            .default_properties(&BlockType::from("heading"))
            .unwrap();
        Block::new(BlockId::from("h-1"), BlockType::from("heading"), 0, props)
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let id = DocumentId::from("landing");

        let ack = backend
            .save(SaveRequest {
                document_id: id.clone(),
                base_version: 0,
                version: 1,
                blocks: vec![heading_block()],
            })
            .await
            .unwrap();
        assert_eq!(ack.new_version, 1);

        let loaded = backend.load(&id).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.blocks.len(), 1);
        assert_eq!(loaded.blocks[0].block_type, BlockType::from("heading"));

        let raw = std::fs::read_to_string(backend.path_for(&id)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let block = &json["blocks"][0];
        assert_eq!(block["id"], "h-1");
        assert_eq!(block["type"], "heading");
        assert_eq!(block["order"], 0);
        assert_eq!(block["properties"]["text"], "Heading");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        assert!(matches!(
            backend.load(&DocumentId::from("ghost")).await,
            Err(LoadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_conflict_when_file_moved_on() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let id = DocumentId::from("landing");

        let save = |base_version, version| SaveRequest {
            document_id: id.clone(),
            base_version,
            version,
            blocks: Vec::new(),
        };

        backend.save(save(0, 5)).await.unwrap();
        assert_eq!(
            backend.save(save(3, 6)).await,
            Err(PersistError::Conflict { remote_version: 5 })
        );
    }

    #[test]
    fn test_path_encodes_id() {
        let backend = FileBackend::new("/data");
        assert_eq!(
            backend.path_for(&DocumentId::from("../etc/passwd")),
            PathBuf::from("/data/%2E%2E%2Fetc%2Fpasswd.json")
        );
        assert_eq!(
            backend.path_for(&DocumentId::from("home_page-2")),
            PathBuf::from("/data/home_page-2.json")
        );
    }

    #[tokio::test]
    async fn test_similar_ids_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let dotted = DocumentId::from("a.b");
        let underscored = DocumentId::from("a_b");
        assert_ne!(backend.path_for(&dotted), backend.path_for(&underscored));

        backend
            .save(SaveRequest {
                document_id: dotted.clone(),
                base_version: 0,
                version: 3,
                blocks: vec![heading_block()],
            })
            .await
            .unwrap();

        assert_eq!(backend.load(&dotted).await.unwrap().version, 3);
        assert!(matches!(backend.load(&underscored).await, Err(LoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_file_holding_another_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let stray = PersistedDocument {
            id: DocumentId::from("other"),
            version: 2,
            blocks: Vec::new(),
        };
        std::fs::write(
            backend.path_for(&DocumentId::from("landing")),
            serde_json::to_string(&stray).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            backend.load(&DocumentId::from("landing")).await,
            Err(LoadError::Backend(_))
        ));
    }
}
