//! Error types for the session store.

use thiserror::Error;
use tower_sessions::session_store;

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Session store errors.
///
/// Only [`Error::Unavailable`] is ever recovered inside the store: the locking
/// wrapper turns it into the operation's default value. Every other kind
/// reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not be reached (connection refused or similar).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A freshly generated id was already present when the creation write landed.
    #[error("session collision on {0:?}")]
    Collision(String),

    /// The flash payload could not be encoded or decoded.
    #[error("flash codec error: {0}")]
    Flash(String),

    /// Attributes could not be serialized for the backend.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored record could not be deserialized.
    #[error("decode error: {0}")]
    Decode(String),

    /// Any other failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error means the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

// Backends only parse JSON on the read path; writes map their errors to `Encode` explicitly.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || is_lost_connection(&err) {
            Self::Unavailable(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}

/// A reset, aborted or broken socket underneath a Redis error.
#[cfg(feature = "redis")]
fn is_lost_connection(err: &redis::RedisError) -> bool {
    use std::io::ErrorKind;

    std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            )
        })
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                Self::Unavailable(err.to_string())
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Maps store errors onto the error kinds used by `tower-sessions` stores.
impl From<Error> for session_store::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Encode(msg) => session_store::Error::Encode(msg),
            Error::Decode(msg) => session_store::Error::Decode(msg),
            Error::Flash(msg) => session_store::Error::Decode(msg),
            other => session_store::Error::Backend(other.to_string()),
        }
    }
}
