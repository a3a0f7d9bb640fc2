//! Store configuration and per-call options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and default-behaviour settings for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend host.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Prefix applied to every key, so several applications can share a backend.
    pub namespace: String,
    /// Default TTL in seconds for written sessions. `None` keeps records until destroyed.
    pub expire_after: Option<u64>,
    /// Whether operations take the store lock by default.
    pub concurrent: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            namespace: "session".to_string(),
            expire_after: None,
            concurrent: false,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from `SESSION_STORE_*` environment variables,
    /// falling back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("SESSION_STORE_HOST") {
            config.host = host;
        }

        if let Some(port) = std::env::var("SESSION_STORE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.port = port;
        }

        if let Ok(namespace) = std::env::var("SESSION_STORE_NAMESPACE") {
            config.namespace = namespace;
        }

        if let Some(secs) = std::env::var("SESSION_STORE_EXPIRE_AFTER")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.expire_after = Some(secs);
        }

        if let Ok(flag) = std::env::var("SESSION_STORE_CONCURRENT") {
            config.concurrent = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Connection URL for a Redis backend at `host:port`.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// The default TTL as a duration; zero means no expiry.
    pub fn ttl(&self) -> Option<Duration> {
        self.expire_after
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Options for a single store call.
///
/// Start from [`KvStore::options`](crate::KvStore::options) to inherit the
/// store's defaults, then adjust per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// TTL applied by `set`. `None` or zero writes without expiry.
    pub expire_after: Option<Duration>,
    /// On `destroy`, skip generating a replacement id.
    pub drop: bool,
    /// Serialize this call behind the store lock.
    pub concurrent: bool,
}

impl Options {
    pub fn with_expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    pub fn with_drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }

    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub(crate) fn ttl(&self) -> Option<Duration> {
        self.expire_after.filter(|ttl| !ttl.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_local_redis() {
        let config = StoreConfig::default();
        assert_eq!(config.redis_url(), "redis://127.0.0.1:6379/");
        assert_eq!(config.namespace, "session");
        assert_eq!(config.ttl(), None);
        assert!(!config.concurrent);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"port": 6380, "expire_after": 3}"#).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6380);
        assert_eq!(config.ttl(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn zero_ttl_means_no_expiry() {
        let config = StoreConfig {
            expire_after: Some(0),
            ..Default::default()
        };
        assert_eq!(config.ttl(), None);

        let options = Options::default().with_expire_after(Duration::ZERO);
        assert_eq!(options.ttl(), None);
    }
}
