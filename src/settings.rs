//! Settings shared by every request: identity, defaults, hooks and the pool.
//!
//! A [`Settings`] value is built once and shared as `Arc<Settings>`. Requests
//! created with [`request`](crate::request) use the process-wide default from
//! [`Settings::global`]; [`request_with`](crate::request_with) takes an
//! explicit instance, which is how tests get isolated hooks.
//!
//! Initialization order: the client pool is created last, inside
//! [`SettingsBuilder::build`], and holds no reference back to the settings.

use crate::pool::{ClientPool, DefaultClientPool, PoolConfig};
use crate::request::RequestSpec;
use crate::{CallError, Error, Result};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// User agent sent when the caller does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("httpcall/", env!("CARGO_PKG_VERSION"));

/// Prefix for diagnostic keys handed to exception hooks.
pub const DEFAULT_ERROR_DATA_PREFIX: &str = "ExceptionalCustom-";

/// Timeout applied to requests without an explicit override.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A profiling scope. Dropping it ends the scope.
pub type ProfileScope = Box<dyn Send>;

/// Called with the mutable request just before it is sent.
pub type BeforeSendHook = Arc<dyn Fn(&mut RequestSpec) + Send + Sync>;

/// Called after a request fails, unless suppressed.
pub type ExceptionHook = Arc<dyn Fn(&ExceptionArgs<'_>) + Send + Sync>;

/// Opens a scope covering one request from send to completion.
pub type ProfileRequestHook = Arc<dyn Fn(&RequestSpec) -> Option<ProfileScope> + Send + Sync>;

/// Opens a named scope around a secondary step such as body decoding.
pub type ProfileGeneralHook = Arc<dyn Fn(&str) -> Option<ProfileScope> + Send + Sync>;

/// What an exception hook sees about a failed request.
pub struct ExceptionArgs<'a> {
    /// The request as it was sent, after before-send hooks ran.
    pub request: &'a RequestSpec,
    /// The captured failure.
    pub error: &'a CallError,
    /// Diagnostic pairs, keys prefixed with [`Settings::error_data_prefix`].
    pub data: Vec<(String, String)>,
}

impl ExceptionArgs<'_> {
    /// Looks up a diagnostic value by its full (prefixed) key.
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

static GLOBAL: OnceLock<Arc<Settings>> = OnceLock::new();

/// Configuration read by every request execution.
///
/// # Examples
///
/// ```
/// use http::HeaderValue;
/// use httpcall::Settings;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let failures = Arc::new(AtomicUsize::new(0));
/// let counter = failures.clone();
///
/// let settings = Settings::builder()
///     .user_agent("my-service/1.0")
///     .default_timeout(Duration::from_secs(10))
///     .unwrap()
///     .on_before_send(|req| {
///         req.headers_mut()
///             .insert("authorization", HeaderValue::from_static("Bearer token"));
///     })
///     .on_exception(move |_args| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .build();
///
/// assert_eq!(settings.user_agent(), "my-service/1.0");
/// ```
pub struct Settings {
    user_agent: String,
    error_data_prefix: String,
    default_timeout: Duration,
    before_send: Vec<BeforeSendHook>,
    exception: Vec<ExceptionHook>,
    profile_request: Option<ProfileRequestHook>,
    profile_general: Option<ProfileGeneralHook>,
    client_pool: Arc<dyn ClientPool>,
}

impl Settings {
    /// Creates a new `SettingsBuilder`.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Returns the process-wide settings, creating defaults on first use.
    pub fn global() -> Arc<Settings> {
        GLOBAL
            .get_or_init(|| Arc::new(Settings::default()))
            .clone()
    }

    /// Installs `settings` as the process-wide default.
    ///
    /// Must be called before the first request that relies on the default.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the default has already been
    /// installed or used.
    pub fn install_global(settings: Settings) -> Result<()> {
        GLOBAL.set(Arc::new(settings)).map_err(|_| {
            Error::ConfigurationError(
                "Global settings are already initialized".to_string(),
            )
        })
    }

    /// The user agent sent when a request carries none.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Prefix applied to diagnostic keys passed to exception hooks.
    pub fn error_data_prefix(&self) -> &str {
        &self.error_data_prefix
    }

    /// Timeout for requests without an override.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// The pool supplying transport clients.
    pub fn client_pool(&self) -> &Arc<dyn ClientPool> {
        &self.client_pool
    }

    pub(crate) fn before_send_hooks(&self) -> &[BeforeSendHook] {
        &self.before_send
    }

    pub(crate) fn exception_hooks(&self) -> &[ExceptionHook] {
        &self.exception
    }

    pub(crate) fn profile_request(&self, request: &RequestSpec) -> Option<ProfileScope> {
        self.profile_request.as_ref().and_then(|hook| hook(request))
    }

    pub(crate) fn profile_general(&self, name: &str) -> Option<ProfileScope> {
        self.profile_general.as_ref().and_then(|hook| hook(name))
    }
}

impl Default for Settings {
    fn default() -> Self {
        SettingsBuilder::new().build()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("user_agent", &self.user_agent)
            .field("error_data_prefix", &self.error_data_prefix)
            .field("default_timeout", &self.default_timeout)
            .field("before_send", &self.before_send.len())
            .field("exception", &self.exception.len())
            .field("profile_request", &self.profile_request.is_some())
            .field("profile_general", &self.profile_general.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Settings`].
///
/// Hooks registered with `on_*` accumulate; each registered hook runs, in
/// registration order.
pub struct SettingsBuilder {
    user_agent: String,
    error_data_prefix: String,
    default_timeout: Duration,
    before_send: Vec<BeforeSendHook>,
    exception: Vec<ExceptionHook>,
    profile_request: Option<ProfileRequestHook>,
    profile_general: Option<ProfileGeneralHook>,
    client_pool: Option<Arc<dyn ClientPool>>,
    pool_config: PoolConfig,
}

impl SettingsBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            error_data_prefix: DEFAULT_ERROR_DATA_PREFIX.to_string(),
            default_timeout: DEFAULT_TIMEOUT,
            before_send: Vec::new(),
            exception: Vec::new(),
            profile_request: None,
            profile_general: None,
            client_pool: None,
            pool_config: PoolConfig::default(),
        }
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the prefix for diagnostic keys.
    pub fn error_data_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.error_data_prefix = prefix.into();
        self
    }

    /// Sets the timeout for requests without an override.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is zero.
    pub fn default_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::ConfigurationError(
                "Default timeout must be positive".to_string(),
            ));
        }
        self.default_timeout = timeout;
        Ok(self)
    }

    /// Adds a hook that may modify each request before it is sent.
    pub fn on_before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestSpec) + Send + Sync + 'static,
    {
        self.before_send.push(Arc::new(hook));
        self
    }

    /// Adds a hook notified of failed requests.
    pub fn on_exception<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ExceptionArgs<'_>) + Send + Sync + 'static,
    {
        self.exception.push(Arc::new(hook));
        self
    }

    /// Sets the hook that opens a scope around each request.
    pub fn profile_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestSpec) -> Option<ProfileScope> + Send + Sync + 'static,
    {
        self.profile_request = Some(Arc::new(hook));
        self
    }

    /// Sets the hook that opens named scopes around decoding steps.
    pub fn profile_general<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> Option<ProfileScope> + Send + Sync + 'static,
    {
        self.profile_general = Some(Arc::new(hook));
        self
    }

    /// Replaces the default client pool.
    pub fn client_pool(mut self, pool: Arc<dyn ClientPool>) -> Self {
        self.client_pool = Some(pool);
        self
    }

    /// Configures the default client pool. Ignored if a custom pool is set.
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Builds the settings, creating the default pool if none was given.
    pub fn build(self) -> Settings {
        let client_pool = self
            .client_pool
            .unwrap_or_else(|| Arc::new(DefaultClientPool::new(self.pool_config)));

        Settings {
            user_agent: self.user_agent,
            error_data_prefix: self.error_data_prefix,
            default_timeout: self.default_timeout,
            before_send: self.before_send,
            exception: self.exception,
            profile_request: self.profile_request,
            profile_general: self.profile_general,
            client_pool,
        }
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.user_agent().starts_with("httpcall/"));
        assert_eq!(settings.error_data_prefix(), "ExceptionalCustom-");
        assert_eq!(settings.default_timeout(), Duration::from_secs(5));
        assert!(settings.before_send_hooks().is_empty());
        assert!(settings.exception_hooks().is_empty());
    }

    #[test]
    fn test_zero_default_timeout_rejected() {
        let result = Settings::builder().default_timeout(Duration::ZERO);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_hooks_accumulate() {
        let settings = Settings::builder()
            .on_before_send(|_| {})
            .on_before_send(|_| {})
            .on_exception(|_| {})
            .build();

        assert_eq!(settings.before_send_hooks().len(), 2);
        assert_eq!(settings.exception_hooks().len(), 1);
    }

    #[test]
    fn test_profile_general_without_hook_is_none() {
        let settings = Settings::default();
        assert!(settings.profile_general("Deserialize: JSON").is_none());
    }

    #[test]
    fn test_global_is_shared() {
        let a = Settings::global();
        let b = Settings::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Settings::install_global(Settings::default()).is_err());
    }
}
