//! Pooling of long-lived transport clients.
//!
//! Building a `reqwest::Client` sets up a connection pool, a TLS context and a
//! resolver, so clients are created once per configuration and then reused by
//! every request that shares it.

use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Identifies a family of requests that can share one transport client.
///
/// Requests with the same effective timeout share a client, and with it the
/// underlying keep-alive connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    /// The effective timeout of the request.
    pub timeout: Duration,
}

impl PoolKey {
    /// Creates a key for the given effective timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Supplies transport clients to the executor.
///
/// Implementations must be safe to call from many requests at once. The
/// default implementation is [`DefaultClientPool`].
///
/// # Examples
///
/// ```
/// use httpcall::{ClientPool, PoolKey};
///
/// /// Hands out a fresh client for every request.
/// struct Unpooled;
///
/// impl ClientPool for Unpooled {
///     fn get(&self, _key: &PoolKey) -> httpcall::Result<reqwest::Client> {
///         reqwest::Client::builder()
///             .build()
///             .map_err(|e| httpcall::Error::ConfigurationError(e.to_string()))
///     }
/// }
/// ```
pub trait ClientPool: Send + Sync {
    /// Returns the client for `key`, creating it on first use.
    fn get(&self, key: &PoolKey) -> Result<reqwest::Client>;

    /// Drops every pooled client. Intended for tests.
    fn reset(&self) {}
}

/// Configuration applied to every client a [`DefaultClientPool`] creates.
///
/// # Examples
///
/// ```
/// use httpcall::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::builder()
///     .pool_max_idle_per_host(16)
///     .pool_idle_timeout(Duration::from_secs(30))
///     .build();
/// assert_eq!(config.pool_max_idle_per_host, 16);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle keep-alive connections retained per host.
    pub pool_max_idle_per_host: usize,

    /// How long an idle connection is kept before being closed.
    ///
    /// `None` keeps idle connections until the server closes them.
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: usize::MAX,
            pool_idle_timeout: Some(Duration::from_secs(90)),
        }
    }
}

impl PoolConfig {
    /// Creates a new builder for configuring the pool.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

/// Builder for `PoolConfig`.
#[derive(Default)]
pub struct PoolConfigBuilder {
    pool_max_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Option<Duration>>,
}

impl PoolConfigBuilder {
    /// Sets the maximum number of idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Sets the idle connection timeout.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(Some(timeout));
        self
    }

    /// Keeps idle connections until the server closes them.
    pub fn no_idle_timeout(mut self) -> Self {
        self.pool_idle_timeout = Some(None);
        self
    }

    /// Builds the `PoolConfig`.
    pub fn build(self) -> PoolConfig {
        let default = PoolConfig::default();
        PoolConfig {
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .unwrap_or(default.pool_max_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(default.pool_idle_timeout),
        }
    }
}

/// The default [`ClientPool`]: one client per [`PoolKey`], kept for the life
/// of the pool.
///
/// Lookups take a read lock. A missing key is created under the write lock
/// after re-checking the map, so concurrent first use of a key builds exactly
/// one client. The lock is never held across an `.await`.
pub struct DefaultClientPool {
    config: PoolConfig,
    clients: RwLock<HashMap<PoolKey, reqwest::Client>>,
}

impl DefaultClientPool {
    /// Creates an empty pool that builds clients with `config`.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of pooled clients.
    pub fn len(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no client has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build_client(&self, key: &PoolKey) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(key.timeout)
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host);
        if let Some(idle) = self.config.pool_idle_timeout {
            builder = builder.pool_idle_timeout(idle);
        }

        builder.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })
    }
}

impl Default for DefaultClientPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl ClientPool for DefaultClientPool {
    fn get(&self, key: &PoolKey) -> Result<reqwest::Client> {
        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(client.clone());
        }

        let mut clients = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(key) {
            return Ok(client.clone());
        }

        let client = self.build_client(key)?;
        tracing::debug!(
            timeout_ms = key.timeout.as_millis(),
            pooled = clients.len() + 1,
            "Created pooled HTTP client"
        );
        clients.insert(*key, client.clone());
        Ok(client)
    }

    fn reset(&self) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
