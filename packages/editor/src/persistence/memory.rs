//! In-memory backend with scripted failures

use super::{check_save, LoadError, PersistError, PersistedDocument, PersistenceApi, SaveAck, SaveRequest};
use crate::ids::DocumentId;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Forced result for the next save call
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Apply the normal acceptance rule
    Accept,
    Transient(String),
    Conflict { remote_version: u64 },
    /// Store the document, then answer as if the response was lost
    LostAck(String),
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<DocumentId, PersistedDocument>,
    script: VecDeque<SaveOutcome>,
    requests: Vec<SaveRequest>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    latency: Duration,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save takes `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a stored document
    pub fn insert(&self, document: PersistedDocument) {
        self.lock().documents.insert(document.id.clone(), document);
    }

    /// Queue forced outcomes for upcoming saves, in order
    pub fn script(&self, outcomes: impl IntoIterator<Item = SaveOutcome>) {
        self.lock().script.extend(outcomes);
    }

    /// Simulate another actor writing a newer version
    pub fn bump_remote(&self, document_id: &DocumentId) -> u64 {
        let mut inner = self.lock();
        let doc = inner
            .documents
            .entry(document_id.clone())
            .or_insert_with(|| PersistedDocument {
                id: document_id.clone(),
                version: 0,
                blocks: Vec::new(),
            });
        doc.version += 1;
        doc.version
    }

    /// Every save request received, in arrival order
    pub fn requests(&self) -> Vec<SaveRequest> {
        self.lock().requests.clone()
    }

    pub fn stored(&self, document_id: &DocumentId) -> Option<PersistedDocument> {
        self.lock().documents.get(document_id).cloned()
    }

    fn store(&self, request: SaveRequest) -> Result<SaveAck, PersistError> {
        let mut inner = self.lock();
        if let Some(ack) = check_save(inner.documents.get(&request.document_id), &request)? {
            return Ok(ack);
        }

        let new_version = request.version;
        inner.documents.insert(
            request.document_id.clone(),
            PersistedDocument {
                id: request.document_id,
                version: new_version,
                blocks: request.blocks,
            },
        );
        Ok(SaveAck { new_version })
    }
}

#[async_trait]
impl PersistenceApi for MemoryBackend {
    async fn save(&self, request: SaveRequest) -> Result<SaveAck, PersistError> {
        let outcome = {
            let mut inner = self.lock();
            inner.requests.push(request.clone());
            inner.script.pop_front().unwrap_or(SaveOutcome::Accept)
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match outcome {
            SaveOutcome::Transient(message) => return Err(PersistError::Transient(message)),
            SaveOutcome::Conflict { remote_version } => return Err(PersistError::Conflict { remote_version }),
            SaveOutcome::LostAck(message) => {
                self.store(request)?;
                return Err(PersistError::Transient(message));
            }
            SaveOutcome::Accept => {}
        }

        self.store(request)
    }

    async fn load(&self, document_id: &DocumentId) -> Result<PersistedDocument, LoadError> {
        self.lock()
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(document_id.clone()))
    }
}
