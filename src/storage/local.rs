//! Local filesystem storage implementation.
//!
//! Each collection is one pretty-printed JSON object mapping document id to
//! document. Writes go through a temp file and a rename, so a crash never
//! leaves a half-written collection behind.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml                   # Application configuration
//! ├── universities.json
//! ├── user_profiles.json
//! ├── studyAbroadPathways.json
//! ├── userStudyAbroadPathways.json
//! ├── subscriptionUsage.json
//! └── exchangeRates.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{Collection, DocumentStore};

type Documents = BTreeMap<String, Value>;

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a collection file.
    fn path(&self, collection: Collection) -> PathBuf {
        self.root_dir.join(format!("{}.json", collection.name()))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read a whole collection, empty if the file doesn't exist.
    async fn read_collection(&self, collection: Collection) -> Result<Documents> {
        let path = self.path(collection);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Documents::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_collection(&self, collection: Collection, docs: &Documents) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(docs)?;
        self.write_bytes(&self.path(collection), &bytes).await
    }

    /// Number of documents per collection, for the `info` command.
    pub async fn counts(&self) -> Result<Vec<(Collection, usize)>> {
        let reads = Collection::ALL.map(|collection| async move {
            let docs = self.read_collection(collection).await?;
            Ok::<_, AppError>((collection, docs.len()))
        });
        future::try_join_all(reads).await
    }
}

#[async_trait]
impl DocumentStore for LocalStorage {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let mut docs = self.read_collection(collection).await?;
        Ok(docs.remove(id))
    }

    async fn put(&self, collection: Collection, id: &str, doc: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.read_collection(collection).await?;
        docs.insert(id.to_string(), doc);
        self.write_collection(collection, &docs).await?;
        log::debug!("Stored {}/{}", collection, id);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut docs = self.read_collection(collection).await?;
        if docs.remove(id).is_none() {
            return Ok(false);
        }
        self.write_collection(collection, &docs).await?;
        log::debug!("Deleted {}/{}", collection, id);
        Ok(true)
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>> {
        Ok(self.read_collection(collection).await?.into_values().collect())
    }
}
