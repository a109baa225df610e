//! Client and proxy configuration types.

use std::time::Duration;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Time allowed until the response head arrives.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Offer HTTP/2 during TLS negotiation.
    pub http2: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            http2: true,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    http2: Option<bool>,
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set whether HTTP/2 is offered.
    #[must_use]
    pub const fn http2(mut self, enabled: bool) -> Self {
        self.http2 = Some(enabled);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            http2: self.http2.unwrap_or(defaults.http2),
        }
    }
}

/// Configuration for the runtime a [`crate::RestProxy`] runs calls on.
///
/// Only used when the proxy owns its runtime; a proxy built with
/// [`crate::RestProxy::with_handle`] runs on the caller's.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Worker threads; `None` uses one per core.
    pub worker_threads: Option<usize>,
    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "courier-worker".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }
}

/// Builder for [`ProxyConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProxyConfigBuilder {
    worker_threads: Option<usize>,
    thread_name: Option<String>,
}

impl ProxyConfigBuilder {
    /// Set the number of worker threads.
    #[must_use]
    pub const fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ProxyConfig {
        let defaults = ProxyConfig::default();
        ProxyConfig {
            worker_threads: self.worker_threads.or(defaults.worker_threads),
            thread_name: self.thread_name.unwrap_or(defaults.thread_name),
        }
    }
}
