//! Directory-backed store: one JSON-lines file per collection.

use super::{ID_FIELD, RecordStore, StoreConnection};
use crate::data::source::DataBatch;
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Store rooted at a directory. Collections live at `<root>/<database>/<collection>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(Box::new(JsonlConnection {
            root: self.root.clone(),
            open: true,
        }))
    }

    fn describe(&self) -> String {
        format!("jsonl://{}", self.root.display())
    }
}

pub struct JsonlConnection {
    root: PathBuf,
    open: bool,
}

impl JsonlConnection {
    fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root
            .join(database)
            .join(format!("{collection}.jsonl"))
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::connection("connection is closed"))
        }
    }

    async fn read_documents(path: &Path) -> Result<Vec<Map<String, Value>>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Map<String, Value>>(line).map_err(|e| {
                    StoreError::query(format!("{}:{}: {e}", path.display(), i + 1))
                })
            })
            .collect()
    }
}

#[async_trait]
impl StoreConnection for JsonlConnection {
    async fn fetch_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<DataBatch, StoreError> {
        self.ensure_open()?;
        let path = self.collection_path(database, collection);
        let docs = Self::read_documents(&path).await?;
        debug!(path = %path.display(), documents = docs.len(), "Fetched collection");
        Ok(DataBatch::from_documents(docs))
    }

    async fn count(&self, database: &str, collection: &str) -> Result<usize, StoreError> {
        self.ensure_open()?;
        Ok(Self::read_documents(&self.collection_path(database, collection))
            .await?
            .len())
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        batch: &DataBatch,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let path = self.collection_path(database, collection);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut buf = String::new();
        for mut doc in batch.to_documents() {
            doc.insert(
                ID_FIELD.to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
            let line = serde_json::to_string(&doc).map_err(|e| StoreError::query(e.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(batch.row_count())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }
}
