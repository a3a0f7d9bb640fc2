//! # Key-Value Session Store
//!
//! A server-side session store that keeps per-client session state in an external
//! key-value service, so sessions survive process restarts and are shared between
//! application instances.
//!
//! The store receives a candidate session id (typically pulled from a cookie by your
//! middleware) and returns an id plus the session's attributes. It never parses or
//! emits cookies itself.
//!
//! ## Features
//!
//! - Collision-checked session id generation
//! - Whole-record load/replace/delete against [Redis](https://crates.io/crates/redis),
//!   a relational table via [Sea-ORM](https://crates.io/crates/sea-orm), or memory
//! - Optional TTL on every write, enforced by the backend
//! - A `flash` attribute encoded with MessagePack, so values JSON cannot represent
//!   (symbols, non-string keys, bytes) survive storage untouched
//! - A store-wide lock for callers running on many tasks at once
//! - Graceful degradation when the backend cannot be reached
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use kv_session_store::{KvStore, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Connect to Redis on 127.0.0.1:6379, keys prefixed with "session:"
//! let store = KvStore::connect(&StoreConfig::default())
//!     .await?
//!     .with_expire_after(Duration::from_secs(24 * 60 * 60));
//!
//! let options = store.options();
//! let (id, mut attributes) = store.get(None, &options).await?;
//! if let Some(id) = id {
//!     attributes.insert("user_id", 123);
//!     store.set(&id, &attributes, &options).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Session Lifecycle
//!
//! ```
//! use kv_session_store::{FlashValue, KvStore, MemoryBackend};
//!
//! # async fn example() -> kv_session_store::Result<()> {
//! let store = KvStore::new(MemoryBackend::new());
//! let options = store.options();
//!
//! // Load (or create) a session
//! let (id, mut attributes) = store.get(Some("id-from-cookie"), &options).await?;
//! let id = id.expect("backend is reachable");
//!
//! // Mutate and persist
//! attributes.insert("counter", 1);
//! attributes.set_flash(FlashValue::Map(vec![(
//!     FlashValue::symbol("notice"),
//!     "Saved!".into(),
//! )]));
//! store.set(&id, &attributes, &options).await?;
//!
//! // Renew: destroy the old record and carry on under a fresh id
//! let renewed = store.destroy(&id, &options).await?;
//! assert!(renewed.is_some());
//!
//! // Log out: destroy without a replacement
//! let dropped = store.destroy(&id, &options.clone().with_drop(true)).await?;
//! assert!(dropped.is_none());
//! # Ok(())
//! # }
//! ```

mod attributes;
pub mod backend;
mod config;
pub mod entity;
mod error;
pub mod flash;
#[cfg(feature = "migration")]
pub mod migration;
mod store;

/// The session store.
///
/// This is the primary type you'll use from this crate.
/// See [`KvStore`] documentation for usage details.
pub use store::{IdSource, KvStore};

/// Session attributes and the structural record they travel in.
pub use attributes::{Attributes, Payload};

/// Backend capability and the bundled implementations.
pub use backend::{KvBackend, MemoryBackend, SeaOrmBackend};

#[cfg(feature = "redis")]
pub use backend::RedisBackend;

/// Store configuration and per-call options.
pub use config::{Options, StoreConfig};

/// Error and result types.
pub use error::{Error, Result};

/// The flash payload type and its reserved attribute key.
pub use flash::{FlashValue, FLASH_KEY};

/// Session store errors as reported by `tower-sessions` stores.
///
/// [`Error`] converts into this for applications that mix both.
pub use tower_sessions::session_store;
