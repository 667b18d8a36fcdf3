//! Conduit Rust Client Library
//!
//! A Rust client for the RealWorld ("Conduit") blogging API. It pairs a
//! request gateway ([`conduit_gateway::ApiClient`]) with a persisted session
//! ([`conduit_session::SessionStore`]) so that the bearer token, the logged-in
//! user and the server's view of the token never drift apart.

pub mod config;
pub mod error;
pub mod forms;
pub mod pagination;

use std::sync::Arc;

use conduit_gateway::types::{ArticlesResponse, FeedParams, UpdateUserRequest, UserResponse};
use conduit_gateway::{ApiClient, Notification, Notifier};
use conduit_session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
use reqwest::Client;
use tokio::sync::broadcast;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::forms::{LoginForm, RegisterForm};

pub use conduit_gateway as gateway;
pub use conduit_session as session;

/// The main entry point for the Conduit client
pub struct Conduit {
    /// Request gateway shared with the session store
    api: Arc<ApiClient>,
    /// Session store for the logged-in user
    session: Arc<SessionStore>,
    /// Publisher for user-facing notifications
    notifier: Notifier,
    /// Client options
    options: ClientOptions,
}

impl Conduit {
    /// Create a new Conduit client
    ///
    /// # Example
    ///
    /// ```
    /// use conduit_rust::{Conduit, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_persist_session(false);
    /// let conduit = Conduit::new(options).unwrap();
    /// assert_eq!(conduit.api().base_url(), "http://localhost:5173/api");
    /// ```
    pub fn new(options: ClientOptions) -> Result<Self> {
        let base_url = options.base_url();
        url::Url::parse(&base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let storage: Arc<dyn SessionStorage> = match (&options.storage_dir, options.persist_session) {
            (Some(dir), true) => Arc::new(FileStorage::new(dir.clone())),
            _ => Arc::new(MemoryStorage::new()),
        };

        let notifier = Notifier::new(options.notification_capacity);
        let api = Arc::new(ApiClient::new(&base_url, http_client, notifier.clone()));
        let session = SessionStore::with_storage_key(api.clone(), storage, notifier.clone(), &options.storage_key);

        log::info!("Conduit client using {}", base_url);

        Ok(Self {
            api,
            session,
            notifier,
            options,
        })
    }

    /// Create a client from `CONDUIT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientOptions::from_env())
    }

    /// Get a reference to the request gateway
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Get a reference to the session store
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Subscribe to notifications raised from here on
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Validate any restored session with the server
    pub async fn initialize(&self) {
        self.session.initialize().await;
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, form: LoginForm) -> Result<UserResponse> {
        let request = form.into_request()?;
        let response = self.api.login(&request).await?;
        self.adopt(response.user).await
    }

    /// Register a new account and sign in as it
    pub async fn sign_up(&self, form: RegisterForm) -> Result<UserResponse> {
        let request = form.into_request()?;
        let response = self.api.register(&request).await?;
        self.adopt(response.user).await
    }

    async fn adopt(&self, user: UserResponse) -> Result<UserResponse> {
        self.session.login(user.clone(), user.token.clone());
        if let Some(delay) = self.options.settle_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(user)
    }

    pub fn sign_out(&self) {
        self.session.logout();
    }

    /// Save changes to the current user and keep the session in step
    pub async fn save_profile(&self, changes: UpdateUserRequest) -> Result<UserResponse> {
        let response = self.api.update_current_user(&changes).await?;
        self.session.update_user(response.user.clone());
        Ok(response.user)
    }

    /// Articles from followed authors; requires a confirmed session
    pub async fn feed(&self, params: FeedParams) -> Result<ArticlesResponse> {
        if !self.session.can_run_authenticated_queries() {
            log::debug!("Feed requested before the session was ready");
            return Err(Error::SessionNotReady);
        }
        Ok(self.api.get_feed(&params).await?)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::forms::{ArticleForm, CommentForm, LoginForm, RegisterForm};
    pub use crate::pagination::Pagination;
    pub use crate::Conduit;
    pub use conduit_gateway::{ApiClient, ApiError, Notification, RuntimeContext, Severity};
    pub use conduit_session::{SessionSnapshot, SessionStore, TokenStatus};
}
