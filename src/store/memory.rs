use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mongodb::bson::{self, Bson, Document};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use super::{SnapshotStream, UserStore};
use crate::models::{RawUserDocument, UserStatus};
use crate::utils::AppError;

/// Process-local store for development (`STORE_BACKEND=memory`) and tests.
/// Supports injected read/write failures.
#[derive(Clone)]
pub struct InMemoryUserStore {
    inner: Arc<Inner>,
}

struct Inner {
    docs: RwLock<BTreeMap<String, Document>>,
    version: watch::Sender<u64>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Inner {
    async fn snapshot(&self) -> Result<Vec<RawUserDocument>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("simulated read failure".into()));
        }
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .map(|(id, data)| RawUserDocument::new(id.clone(), data.clone()))
            .collect())
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::from_map(BTreeMap::new())
    }

    pub fn with_documents(docs: impl IntoIterator<Item = RawUserDocument>) -> Self {
        Self::from_map(docs.into_iter().map(|raw| (raw.id, raw.data)).collect())
    }

    fn from_map(docs: BTreeMap<String, Document>) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(docs),
                version,
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    /// Seeds from a JSON array of objects; each object needs an `id` or `_id` string
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| AppError::ConfigError(format!("Invalid seed JSON: {}", e)))?;

        let mut docs = Vec::with_capacity(values.len());
        for value in values {
            let mut data = bson::to_document(&value)
                .map_err(|e| AppError::ConfigError(format!("Seed entry is not an object: {}", e)))?;
            let id = match data.remove("_id").or_else(|| data.remove("id")) {
                Some(Bson::String(id)) if !id.is_empty() => id,
                _ => return Err(AppError::ConfigError("Seed entry without a string id".into())),
            };
            docs.push(RawUserDocument::new(id, data));
        }

        Ok(Self::with_documents(docs))
    }

    /// Creates or replaces a document, as an external writer would
    pub async fn put(&self, raw: RawUserDocument) {
        self.inner.docs.write().await.insert(raw.id, raw.data);
        self.inner.notify();
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.inner.docs.write().await.remove(id).is_some();
        if removed {
            self.inner.notify();
        }
        removed
    }

    pub async fn get(&self, id: &str) -> Option<Document> {
        self.inner.docs.read().await.get(id).cloned()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.version.receiver_count()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn fetch_all(&self) -> Result<Vec<RawUserDocument>, AppError> {
        self.inner.snapshot().await
    }

    async fn update_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("simulated write failure".into()));
        }

        {
            let mut docs = self.inner.docs.write().await;
            let data = docs
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
            data.insert("status", status.as_str());
        }

        self.inner.notify();
        Ok(())
    }

    async fn subscribe(&self) -> Result<SnapshotStream, AppError> {
        let inner = Arc::clone(&self.inner);
        let initial = inner.snapshot().await?;
        let changes = inner.version.subscribe();

        let updates = stream::unfold((inner, changes), |(inner, mut changes)| async move {
            changes.changed().await.ok()?;
            let snapshot = inner.snapshot().await;
            Some((snapshot, (inner, changes)))
        });

        Ok(stream::once(async move { Ok::<_, AppError>(initial) }).chain(updates).boxed())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
