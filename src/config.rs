//! Configuration options for the Conduit client

use conduit_gateway::base_url::{self, RuntimeContext, DEFAULT_PROXY_ORIGIN};
use conduit_session::DEFAULT_STORAGE_KEY;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration options for the Conduit client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Where the client is running; decides which origin serves the API
    pub context: RuntimeContext,

    /// Origin of the development proxy
    pub proxy_origin: String,

    /// Origin of the deployed backend
    pub api_origin: Option<String>,

    /// Whether the session is written to disk
    pub persist_session: bool,

    /// Directory for the session file. Memory only when unset.
    pub storage_dir: Option<PathBuf>,

    /// The persist session key
    pub storage_key: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Buffered notifications per subscriber
    pub notification_capacity: usize,

    /// Pause after sign-in before returning
    pub settle_delay: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            context: RuntimeContext::Detached,
            proxy_origin: DEFAULT_PROXY_ORIGIN.to_string(),
            api_origin: None,
            persist_session: true,
            storage_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            request_timeout: None,
            notification_capacity: 64,
            settle_delay: None,
        }
    }
}

impl ClientOptions {
    /// Build options from `CONDUIT_*` environment variables over the defaults
    ///
    /// * `CONDUIT_API_BASE_URL` - origin of the deployed backend
    /// * `CONDUIT_HOSTNAME` - browser hostname; detached when unset
    /// * `CONDUIT_PROXY_ORIGIN` - origin of the development proxy
    /// * `CONDUIT_SESSION_DIR` - directory for the session file
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut options = Self::default();
        if let Some(origin) = value("CONDUIT_API_BASE_URL") {
            options = options.with_api_origin(&origin);
        }
        if let Some(hostname) = value("CONDUIT_HOSTNAME") {
            options = options.with_context(RuntimeContext::browser(hostname));
        }
        if let Some(origin) = value("CONDUIT_PROXY_ORIGIN") {
            options = options.with_proxy_origin(&origin);
        }
        if let Some(dir) = value("CONDUIT_SESSION_DIR") {
            options = options.with_storage_dir(dir);
        }
        options
    }

    /// Set the runtime context
    pub fn with_context(mut self, value: RuntimeContext) -> Self {
        self.context = value;
        self
    }

    /// Set the development proxy origin
    pub fn with_proxy_origin(mut self, value: &str) -> Self {
        self.proxy_origin = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the deployed backend origin
    pub fn with_api_origin(mut self, value: &str) -> Self {
        self.api_origin = Some(value.trim_end_matches('/').to_string());
        self
    }

    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the session directory
    pub fn with_storage_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(value.into());
        self
    }

    /// Set the persist session key
    pub fn with_storage_key(mut self, value: &str) -> Self {
        self.storage_key = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the notification buffer size
    pub fn with_notification_capacity(mut self, value: usize) -> Self {
        self.notification_capacity = value.max(1);
        self
    }

    /// Set the post sign-in pause
    pub fn with_settle_delay(mut self, value: Option<Duration>) -> Self {
        self.settle_delay = value;
        self
    }

    /// The API base URL these options resolve to
    pub fn base_url(&self) -> String {
        base_url::resolve(&self.context, &self.proxy_origin, self.api_origin.as_deref())
    }
}
