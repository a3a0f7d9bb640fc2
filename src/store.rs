use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tower_sessions::session::Id;
use tracing::{debug, error, warn};

use crate::attributes::{Attributes, Payload};
use crate::backend::KvBackend;
use crate::config::{Options, StoreConfig};
use crate::error::{Error, Result};

/// Produces candidate session ids.
pub type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

/// A session store persisting attributes in a key-value backend.
///
/// `KvStore` hands out collision-checked session ids, loads and replaces whole
/// attribute records, applies TTLs on write, and passes the reserved `flash`
/// attribute through an opaque codec so it survives the backend's JSON
/// encoding unchanged.
///
/// # Features
///
/// - Backend-agnostic: anything implementing [`KvBackend`] (Redis, a SQL table via Sea-ORM, memory)
/// - Collision-safe ID generation
/// - Optional per-write TTL
/// - A store-wide lock for concurrent callers
/// - Graceful degradation when the backend is unreachable
///
/// # Usage
///
/// ```
/// use kv_session_store::{KvStore, MemoryBackend};
///
/// # async fn example() -> kv_session_store::Result<()> {
/// let store = KvStore::new(MemoryBackend::new());
/// let options = store.options();
///
/// // No candidate id: a fresh, empty session is created.
/// let (id, mut attributes) = store.get(None, &options).await?;
/// let id = id.expect("backend is reachable");
///
/// attributes.insert("counter", 1);
/// store.set(&id, &attributes, &options).await?;
///
/// let (_, attributes) = store.get(Some(&id), &options).await?;
/// assert_eq!(attributes.get("counter"), Some(&serde_json::json!(1)));
/// # Ok(())
/// # }
/// ```
///
/// # Concurrency
///
/// The store owns a single lock. Calls made with [`Options::concurrent`] set
/// are serialized behind it, across all session ids, which makes the
/// check-generate-create sequence of [`get`](Self::get) atomic for callers of
/// the same store. Clones share the lock. Nothing is serialized across
/// processes or across separately constructed stores.
///
/// Writes replace the whole record. Two callers holding the same session and
/// writing different keys do not merge: the last write wins.
///
/// # Error Handling
///
/// An unreachable backend never fails an operation: `get` yields `(None, {})`,
/// `set` and `destroy` yield `None`, and a warning is logged. Collisions,
/// corrupt flash payloads and all other backend errors are returned.
#[derive(Clone)]
pub struct KvStore<B> {
    /// The key-value backend every operation round-trips to.
    backend: B,
    /// Held while a concurrent-mode operation runs.
    lock: Arc<Mutex<()>>,
    /// Source of candidate ids.
    id_source: IdSource,
    /// Default TTL handed out by [`options`](Self::options).
    expire_after: Option<Duration>,
    /// Default locking mode handed out by [`options`](Self::options).
    concurrent: bool,
}

impl<B: fmt::Debug> fmt::Debug for KvStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvStore")
            .field("backend", &self.backend)
            .field("expire_after", &self.expire_after)
            .field("concurrent", &self.concurrent)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "redis")]
impl KvStore<crate::backend::RedisBackend> {
    /// Connects to Redis and builds a store from `config`.
    ///
    /// ```no_run
    /// use kv_session_store::{KvStore, StoreConfig};
    ///
    /// # async fn example() -> kv_session_store::Result<()> {
    /// let config = StoreConfig {
    ///     namespace: "my_app".to_string(),
    ///     expire_after: Some(3600),
    ///     ..Default::default()
    /// };
    /// let store = KvStore::connect(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let backend = crate::backend::RedisBackend::connect(config).await?;
        Ok(Self::from_config(backend, config))
    }
}

impl<B: KvBackend> KvStore<B> {
    /// Creates a store over `backend` with no default TTL and locking disabled.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
            id_source: Arc::new(|| Id::default().to_string()),
            expire_after: None,
            concurrent: false,
        }
    }

    /// Creates a store over `backend`, taking its defaults from `config`.
    ///
    /// The backend is expected to be built from the same config; only the TTL
    /// and locking defaults are read here.
    pub fn from_config(backend: B, config: &StoreConfig) -> Self {
        let mut store = Self::new(backend).with_concurrent(config.concurrent);
        store.expire_after = config.ttl();
        store
    }

    /// Sets the default TTL for written sessions.
    pub fn with_expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl).filter(|ttl| !ttl.is_zero());
        self
    }

    /// Sets whether operations take the store lock by default.
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Replaces the source of candidate ids.
    ///
    /// The default draws a random 128-bit `tower-sessions` id, base64url
    /// encoded. Whatever the source returns is still checked against the
    /// backend before use.
    pub fn with_id_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_source = Arc::new(source);
        self
    }

    /// The backend this store reads and writes through.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Per-call options seeded with this store's defaults.
    pub fn options(&self) -> Options {
        Options {
            expire_after: self.expire_after,
            drop: false,
            concurrent: self.concurrent,
        }
    }

    /// Generates an id that holds no record in the backend.
    ///
    /// Candidates are drawn until one is absent; each draw costs one backend
    /// read. Backend errors are returned rather than retried.
    pub async fn generate_id(&self) -> Result<String> {
        loop {
            let id = (self.id_source)();
            if !self.backend.exists(&id).await? {
                return Ok(id);
            }
            debug!(session_id = %id, "Generated session id already in use, drawing another");
        }
    }

    /// Runs `body`, behind the store lock when `concurrent` is set.
    ///
    /// If `body` fails because the backend is unavailable, a warning is logged
    /// and `default` is returned instead. Every other error propagates. The
    /// lock is released however `body` ends.
    pub async fn with_lock<T, F>(&self, concurrent: bool, default: T, body: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _guard = if concurrent {
            Some(self.lock.lock().await)
        } else {
            None
        };

        match body.await {
            Err(err) if err.is_unavailable() => {
                warn!(error = %err, "Session backend unavailable, using default");
                Ok(default)
            }
            result => result,
        }
    }

    /// Loads the session named by `candidate`, or creates a fresh one.
    ///
    /// When the candidate is missing, expired or unknown, a new id is
    /// generated and an empty record is created under it. The creation write
    /// must be accepted by the backend; a refusal means the id appeared
    /// between the check and the write and is reported as
    /// [`Error::Collision`].
    ///
    /// Returns `(None, {})` if the backend is unreachable.
    pub async fn get(
        &self,
        candidate: Option<&str>,
        options: &Options,
    ) -> Result<(Option<String>, Attributes)> {
        self.with_lock(options.concurrent, (None, Attributes::new()), async {
            if let Some(id) = candidate.filter(|id| !id.is_empty()) {
                if let Some(payload) = self.backend.get(id).await? {
                    let attributes = Attributes::from_payload(payload)?;
                    return Ok((Some(id.to_string()), attributes));
                }
            }

            let id = self.generate_id().await?;
            if !self.backend.set_nx(&id, &Payload::new()).await? {
                error!(session_id = %id, "Session id collided at creation");
                return Err(Error::Collision(id));
            }

            debug!(session_id = %id, "Created session");
            Ok((Some(id), Attributes::new()))
        })
        .await
    }

    /// Replaces the record under `id` with `attributes`.
    ///
    /// The flash slot is encoded before writing. With a non-zero
    /// `options.expire_after` the record expires that long after this write;
    /// otherwise it lives until destroyed. The id is never rotated here.
    ///
    /// Returns `Some(id)` on success and `None` if the backend is unreachable.
    pub async fn set(
        &self,
        id: &str,
        attributes: &Attributes,
        options: &Options,
    ) -> Result<Option<String>> {
        self.with_lock(options.concurrent, None, async {
            let payload = attributes.to_payload()?;
            match options.ttl() {
                Some(ttl) => {
                    debug!(
                        session_id = %id,
                        ttl_secs = ttl.as_secs_f64(),
                        "Saving session with expiry"
                    );
                    self.backend.set_ex(id, ttl, &payload).await?;
                }
                None => {
                    debug!(session_id = %id, "Saving session");
                    self.backend.set(id, &payload).await?;
                }
            }
            Ok(Some(id.to_string()))
        })
        .await
    }

    /// Deletes the record under `id`.
    ///
    /// Unless `options.drop` is set, a replacement id is generated and
    /// returned so the caller can carry on with a fresh session; this is how
    /// a session is renewed. With `drop`, or if the backend is unreachable,
    /// returns `None`.
    pub async fn destroy(&self, id: &str, options: &Options) -> Result<Option<String>> {
        self.with_lock(options.concurrent, None, async {
            let removed = self.backend.del(id).await?;
            debug!(session_id = %id, removed, drop = options.drop, "Destroyed session");

            if options.drop {
                return Ok(None);
            }
            self.generate_id().await.map(Some)
        })
        .await
    }
}
