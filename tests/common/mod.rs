#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kv_session_store::{Error, KvBackend, MemoryBackend, Payload, Result};

/// A memory backend that can be switched into failure modes.
#[derive(Debug, Clone, Default)]
pub struct FlakyBackend {
    pub inner: MemoryBackend,
    down: Arc<AtomicBool>,
    broken: Arc<AtomicBool>,
    refuse_create: Arc<AtomicBool>,
}

impl FlakyBackend {
    /// Every call fails as if the connection were refused.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Every call fails with a non-connection error.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    /// `set_nx` reports the key as present even though `exists` said otherwise.
    pub fn set_refuse_create(&self, refuse: bool) {
        self.refuse_create.store(refuse, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("Connection refused (os error 111)".into()));
        }
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::Backend("WRONGTYPE Operation against a key".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for FlakyBackend {
    async fn get(&self, id: &str) -> Result<Option<Payload>> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn set(&self, id: &str, payload: &Payload) -> Result<()> {
        self.check()?;
        self.inner.set(id, payload).await
    }

    async fn set_ex(&self, id: &str, ttl: Duration, payload: &Payload) -> Result<()> {
        self.check()?;
        self.inner.set_ex(id, ttl, payload).await
    }

    async fn set_nx(&self, id: &str, payload: &Payload) -> Result<bool> {
        self.check()?;
        if self.refuse_create.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.set_nx(id, payload).await
    }

    async fn del(&self, id: &str) -> Result<bool> {
        self.check()?;
        self.inner.del(id).await
    }
}

pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
