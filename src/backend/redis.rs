use std::fmt;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;

use super::{namespaced, KvBackend};
use crate::attributes::Payload;
use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Redis backend storing each session as a JSON string under `namespace:id`.
///
/// The connection manager reconnects on its own; a refused connection surfaces
/// as [`Error::Unavailable`].
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    namespace: String,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connects to the Redis server described by `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = ::redis::Client::open(config.redis_url())
            .map_err(|e| Error::Backend(e.to_string()))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(conn, config.namespace.clone()))
    }

    /// Wraps an existing connection manager.
    pub fn from_connection(conn: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    fn key(&self, id: &str) -> String {
        namespaced(&self.namespace, id)
    }
}

fn encode(payload: &Payload) -> Result<String> {
    serde_json::to_string(payload).map_err(|e| Error::Encode(e.to_string()))
}

// PSETEX rejects zero, and `as_millis` can exceed what the command accepts.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, id: &str) -> Result<Option<Payload>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(id)).await?;
        Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
    }

    async fn set(&self, id: &str, payload: &Payload) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.key(id), encode(payload)?).await?;
        Ok(())
    }

    async fn set_ex(&self, id: &str, ttl: Duration, payload: &Payload) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(self.key(id), encode(payload)?, ttl_millis(ttl))
            .await?;
        Ok(())
    }

    async fn set_nx(&self, id: &str, payload: &Payload) -> Result<bool> {
        let mut conn = self.conn.clone();
        let created: bool = conn.set_nx(self.key(id), encode(payload)?).await?;
        Ok(created)
    }

    async fn del(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(self.key(id)).await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(self.key(id)).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_keeps_sub_second_precision() {
        assert_eq!(ttl_millis(Duration::from_millis(2900)), 2900);
        assert_eq!(ttl_millis(Duration::from_millis(500)), 500);
        assert_eq!(ttl_millis(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn ttl_is_clamped_to_the_command_range() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }
}
