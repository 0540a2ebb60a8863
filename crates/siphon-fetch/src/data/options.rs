use std::time::Duration;

/// Connection-establishment timeout handed to the transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for one bounded write into a sink.
///
/// Raising it means fewer wakeups but a slower reaction to shutdown.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Upper bound for one wait on transport activity.
pub const DEFAULT_ACTIVITY_WAIT: Duration = Duration::from_millis(100);

/// Redirect hops followed before the transport gives up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default user agent: `siphon/<version>`.
pub const DEFAULT_USER_AGENT: &str = concat!("siphon/", env!("CARGO_PKG_VERSION"));

/// Configuration shared by every fetch made from a [`ContentFetcher`](crate::ContentFetcher).
///
/// # Examples
///
/// ```
/// use siphon_fetch::FetchConfig;
/// use std::time::Duration;
///
/// let config = FetchConfig::default()
///     .user_agent("MyPlayer/2.1")
///     .connect_timeout(Duration::from_secs(10))
///     .sink_capacity(256 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Value of the `User-Agent` request header.
    ///
    /// Default: `siphon/<version>`
    pub user_agent: String,

    /// Maximum time to establish a connection.
    ///
    /// Default: 30s
    pub connect_timeout: Duration,

    /// Follow `Location` redirects.
    ///
    /// Default: true
    pub follow_redirects: bool,

    /// Redirect hops followed when `follow_redirects` is set.
    ///
    /// Default: 10
    pub max_redirects: usize,

    /// Keep cookies set by responses for the rest of the transfer, so that
    /// redirect chains relying on them resolve.
    ///
    /// Default: true
    pub cookies: bool,

    /// Send a `Referer` header when following a redirect.
    ///
    /// Default: true
    pub auto_referer: bool,

    /// Timeout of one bounded sink write. A timed-out write is retried.
    ///
    /// Default: 100ms
    pub write_timeout: Duration,

    /// Longest single wait for transport activity. Also bounds how long the
    /// background task takes to notice shutdown.
    ///
    /// Default: 100ms
    pub activity_wait: Duration,

    /// Capacity of the attachment created when the caller passes no sink.
    ///
    /// Default: 64 KiB
    pub sink_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent:       DEFAULT_USER_AGENT.to_string(),
            connect_timeout:  DEFAULT_CONNECT_TIMEOUT,
            follow_redirects: true,
            max_redirects:    DEFAULT_MAX_REDIRECTS,
            cookies:          true,
            auto_referer:     true,
            write_timeout:    DEFAULT_WRITE_TIMEOUT,
            activity_wait:    DEFAULT_ACTIVITY_WAIT,
            sink_capacity:    siphon_sink::Attachment::DEFAULT_CAPACITY,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow_redirects: bool) -> Self {
        self.follow_redirects = follow_redirects;
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    #[must_use]
    pub fn cookies(mut self, cookies: bool) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn auto_referer(mut self, auto_referer: bool) -> Self {
        self.auto_referer = auto_referer;
        self
    }

    #[must_use]
    pub fn write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    #[must_use]
    pub fn activity_wait(mut self, activity_wait: Duration) -> Self {
        self.activity_wait = activity_wait;
        self
    }

    #[must_use]
    pub fn sink_capacity(mut self, sink_capacity: usize) -> Self {
        self.sink_capacity = sink_capacity;
        self
    }
}

/// Per-request settings handed to [`Transport::configure`](crate::Transport::configure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub url:              String,
    pub follow_redirects: bool,
    pub max_redirects:    usize,
    pub cookies:          bool,
    pub auto_referer:     bool,
    pub connect_timeout:  Duration,
    pub user_agent:       String,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>, config: &FetchConfig) -> Self {
        Self {
            url:              url.into(),
            follow_redirects: config.follow_redirects,
            max_redirects:    config.max_redirects,
            cookies:          config.cookies,
            auto_referer:     config.auto_referer,
            connect_timeout:  config.connect_timeout,
            user_agent:       config.user_agent.clone(),
        }
    }
}
