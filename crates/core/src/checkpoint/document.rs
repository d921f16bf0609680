use crate::checkpoint::{CheckpointKey, CheckpointStore, Cursor};
use anyhow::Context;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Whole-document state collaborators: the entire checkpoint document travels
/// as one serialized string.
#[async_trait::async_trait]
pub trait StateBackend: Send + Sync {
    async fn get(&self) -> anyhow::Result<String>;

    async fn post(&self, document: String) -> anyhow::Result<()>;
}

/// Per-key checkpoint store layered over a whole-document backend.
///
/// Each upsert is a read-modify-write of the full document, serialized behind
/// an internal mutex so concurrent upserts from this process cannot clobber
/// each other's keys.
pub struct DocumentCheckpointStore<B> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: StateBackend> DocumentCheckpointStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    async fn read_document(&self) -> anyhow::Result<Map<String, Value>> {
        let raw = self.backend.get().await.context("checkpoint read failed")?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("checkpoint document is not valid JSON: {raw}"))?;
        match value {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("checkpoint document is not a JSON object: {other}"),
        }
    }

    fn entry<'a>(document: &'a Map<String, Value>, key: &CheckpointKey) -> Option<&'a Value> {
        match &key.portfolio_id {
            None => document.get(&key.domain),
            Some(portfolio_id) => document
                .get(portfolio_id)?
                .get("companies")?
                .get(&key.domain),
        }
    }

    fn set_entry(document: &mut Map<String, Value>, key: &CheckpointKey, raw: String) {
        match &key.portfolio_id {
            None => {
                document.insert(key.domain.clone(), Value::String(raw));
            }
            Some(portfolio_id) => {
                // First upsert for a portfolio creates its scaffolding.
                let portfolio = document
                    .entry(portfolio_id.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !portfolio.is_object() {
                    *portfolio = Value::Object(Map::new());
                }
                if let Value::Object(portfolio) = portfolio {
                    let companies = portfolio
                        .entry("companies".to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !companies.is_object() {
                        *companies = Value::Object(Map::new());
                    }
                    if let Value::Object(companies) = companies {
                        companies.insert(key.domain.clone(), Value::String(raw));
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl<B: StateBackend> CheckpointStore for DocumentCheckpointStore<B> {
    async fn load(&self, key: &CheckpointKey) -> anyhow::Result<Option<Cursor>> {
        let document = self.read_document().await?;
        match Self::entry(&document, key) {
            None => Ok(None),
            Some(Value::String(raw)) => Cursor::decode(raw).map(Some),
            Some(other) => anyhow::bail!(
                "checkpoint entry for {:?} is not a cursor string: {other}",
                key.domain
            ),
        }
    }

    async fn upsert(&self, key: &CheckpointKey, cursor: &Cursor) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        Self::set_entry(&mut document, key, cursor.encode());
        let raw = serde_json::to_string(&document).context("checkpoint serialize failed")?;
        self.backend
            .post(raw)
            .await
            .context("checkpoint write failed")
    }
}

/// Checkpoint document in a local JSON file. A missing file reads as an empty
/// document.
#[derive(Debug, Clone)]
pub struct FileStateBackend {
    path: PathBuf,
}

impl FileStateBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl StateBackend for FileStateBackend {
    async fn get(&self) -> anyhow::Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        }
    }

    async fn post(&self, document: String) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        tokio::fs::write(&self.path, document)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Document held in memory. Backs tests and local dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStateBackend {
    document: std::sync::Mutex<String>,
}

impl InMemoryStateBackend {
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: std::sync::Mutex::new(document.into()),
        }
    }

    pub fn document(&self) -> String {
        self.document.lock().expect("state lock poisoned").clone()
    }
}

#[async_trait::async_trait]
impl StateBackend for InMemoryStateBackend {
    async fn get(&self) -> anyhow::Result<String> {
        Ok(self.document())
    }

    async fn post(&self, document: String) -> anyhow::Result<()> {
        *self.document.lock().expect("state lock poisoned") = document;
        Ok(())
    }
}
