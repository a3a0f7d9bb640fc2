//! Key-value backends the session store persists to.
//!
//! A backend is a capability exposing GET/SET/SETEX/DEL over namespaced keys.
//! Connection handling, command encoding and transport retries stay inside the
//! implementation; the store only sees [`KvBackend`].

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::attributes::Payload;
use crate::error::Result;

mod database;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use database::SeaOrmBackend;
pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

/// Storage capability used by [`KvStore`](crate::KvStore).
///
/// Implementations must map an unreachable backend to
/// [`Error::Unavailable`](crate::Error::Unavailable) so the store can degrade
/// instead of failing the request.
#[async_trait]
pub trait KvBackend: Debug + Send + Sync + 'static {
    /// Reads the live record stored under `id`.
    async fn get(&self, id: &str) -> Result<Option<Payload>>;

    /// Writes `payload` under `id` without expiry, replacing any existing record.
    async fn set(&self, id: &str, payload: &Payload) -> Result<()>;

    /// Writes `payload` under `id`, expiring it `ttl` after this write.
    async fn set_ex(&self, id: &str, ttl: Duration, payload: &Payload) -> Result<()>;

    /// Creates `id` only if it holds no live record.
    ///
    /// Returns `false` when the backend refused because the key was present.
    async fn set_nx(&self, id: &str, payload: &Payload) -> Result<bool>;

    /// Deletes `id`, returning whether a record was removed.
    async fn del(&self, id: &str) -> Result<bool>;

    /// Whether `id` currently holds a live record.
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Joins a namespace and a session id into a backend key.
pub(crate) fn namespaced(namespace: &str, id: &str) -> String {
    format!("{namespace}:{id}")
}
