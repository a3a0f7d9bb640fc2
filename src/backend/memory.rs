use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{namespaced, KvBackend};
use crate::attributes::Payload;
use crate::error::{Error, Result};

#[derive(Debug)]
struct Entry {
    data: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// In-process backend keeping JSON-encoded records in a shared map.
///
/// Clones share the same storage. Expiry follows tokio's clock, so tests can
/// drive it with a paused runtime.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    namespace: String,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend using the `session` namespace.
    pub fn new() -> Self {
        Self {
            namespace: "session".to_string(),
            entries: Arc::default(),
        }
    }

    /// Returns a view over the same storage under a different namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::clone(&self.entries),
        }
    }

    /// The prefix applied to keys written through this view.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of live records across all namespaces.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether no live records remain in any namespace.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn write(&self, id: &str, payload: &Payload, ttl: Option<Duration>) -> Result<()> {
        let data = serde_json::to_string(payload).map_err(|e| Error::Encode(e.to_string()))?;
        let expires_at = ttl
            .map(|ttl| {
                Instant::now()
                    .checked_add(ttl)
                    .ok_or_else(|| Error::Encode(format!("ttl of {ttl:?} is out of range")))
            })
            .transpose()?;
        let entry = Entry { data, expires_at };
        self.entries
            .write()
            .await
            .insert(namespaced(&self.namespace, id), entry);
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, id: &str) -> Result<Option<Payload>> {
        let key = namespaced(&self.namespace, id);
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.is_live(now) => {
                    return Ok(Some(serde_json::from_str(&entry.data)?));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: purge lazily.
        let mut entries = self.entries.write().await;
        if entries.get(&key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(&key);
        }
        Ok(None)
    }

    async fn set(&self, id: &str, payload: &Payload) -> Result<()> {
        self.write(id, payload, None).await
    }

    async fn set_ex(&self, id: &str, ttl: Duration, payload: &Payload) -> Result<()> {
        self.write(id, payload, Some(ttl)).await
    }

    async fn set_nx(&self, id: &str, payload: &Payload) -> Result<bool> {
        let data = serde_json::to_string(payload).map_err(|e| Error::Encode(e.to_string()))?;
        let key = namespaced(&self.namespace, id);
        let now = Instant::now();

        let mut entries = self.entries.write().await;
        if entries.get(&key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key,
            Entry {
                data,
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn del(&self, id: &str) -> Result<bool> {
        let key = namespaced(&self.namespace, id);
        let now = Instant::now();
        let removed = self.entries.write().await.remove(&key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }
}
