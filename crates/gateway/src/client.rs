use crate::error::{ApiError, Result};
use crate::fetch::{self, RequestOptions};
use crate::jwt;
use crate::notify::Notifier;
use crate::types::*;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

/// Why the gateway gave up on the current token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Detected locally before any request was sent.
    Expired,
    /// Rejected by the server with a 401.
    Rejected,
}

/// Receives session invalidations synchronously, before the failing
/// request returns to its caller.
pub trait InvalidationListener: Send + Sync {
    fn session_invalidated(&self, reason: Invalidation);
}

/// Client for the Conduit REST API
pub struct ApiClient {
    base_url: String,
    http_client: Client,
    notifier: Notifier,
    token: RwLock<Option<String>>,
    listener: RwLock<Option<Weak<dyn InvalidationListener>>>,
    invalidations: broadcast::Sender<Invalidation>,
}

impl ApiClient {
    /// Create a new client rooted at `base_url` (already including `/api`)
    pub fn new(base_url: &str, http_client: Client, notifier: Notifier) -> Self {
        let (invalidations, _) = broadcast::channel(16);
        log::debug!("API client initializing with base URL {}", base_url);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            notifier,
            token: RwLock::new(None),
            listener: RwLock::new(None),
            invalidations,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Replace the bearer token used by subsequent requests
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Register the single listener told about invalidated sessions.
    ///
    /// Replaces any earlier registration.
    pub fn set_invalidation_listener(&self, listener: Weak<dyn InvalidationListener>) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Stream of invalidations, published after the listener has run
    pub fn on_session_invalidated(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    /// Give up on `token`, unless it has been replaced since the request began
    fn invalidate(&self, reason: Invalidation, token: &str) {
        if self.token().as_deref() != Some(token) {
            log::debug!("Token replaced in flight; ignoring {:?} for the old one", reason);
            return;
        }

        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);

        // The lock is released here; the listener calls back into set_token.
        if let Some(listener) = listener {
            listener.session_invalidated(reason);
        }

        let _ = self.invalidations.send(reason);
    }

    /// Perform one API call and classify its outcome.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T> {
        log::debug!("API request starting: {} {}", options.method, endpoint);

        let token = self.token();

        if let Some(ref token) = token {
            if jwt::is_token_expired(token) {
                log::warn!("Token expired before request to {}", endpoint);
                self.notifier
                    .error("Session Expired", "Your session has expired. Please log in again.");
                self.invalidate(Invalidation::Expired, token);
                return Err(ApiError::AuthExpired);
            }
        }

        let url = format!("{}{}", self.base_url, endpoint);
        log::debug!("Request URL: {} (authenticated: {})", url, token.is_some());

        let builder = match fetch::build(&self.http_client, &url, &options, token.as_deref()) {
            Ok(builder) => builder,
            Err(err) => return Err(self.request_failed(endpoint, err)),
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                log::error!("Network connectivity error for {}: {}", endpoint, err);
                self.notify_network_error();
                return Err(ApiError::Network(err));
            }
        };

        let status = response.status();
        log::debug!("Response received: {} for {}", status, endpoint);

        if let Some(sent) = token.as_deref().filter(|_| status == StatusCode::UNAUTHORIZED) {
            log::warn!("Authentication failed (401) for {}", endpoint);
            self.notifier
                .error("Authentication Failed", "Your session is invalid. Please log in again.");
            self.invalidate(Invalidation::Rejected, sent);
            return Err(ApiError::AuthRejected);
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("Failed reading response body for {}: {}", endpoint, err);
                self.notify_network_error();
                return Err(ApiError::Network(err));
            }
        };

        if !status.is_success() {
            let message = error_message(&bytes).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            log::error!("API error response {} for {}: {}", status, endpoint, message);
            self.notifier.error("Request Failed", message.clone());
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = if bytes.is_empty() {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };

        match parsed {
            Ok(data) => {
                log::debug!("API request successful: {}", endpoint);
                Ok(data)
            }
            Err(err) => {
                log::error!("Unexpected response body for {}: {}", endpoint, err);
                self.notifier.error("Request Failed", "The server sent an unexpected response.");
                Err(ApiError::Decode(err))
            }
        }
    }

    /// Like [`ApiClient::request`], with `body` serialized as the JSON payload
    pub async fn request_json<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        options: RequestOptions,
        body: &B,
    ) -> Result<T> {
        match options.json(body) {
            Ok(options) => self.request(endpoint, options).await,
            Err(err) => Err(self.request_failed(endpoint, err)),
        }
    }

    fn request_failed(&self, endpoint: &str, err: ApiError) -> ApiError {
        log::error!("Could not build request for {}: {}", endpoint, err);
        self.notifier.error("Request Failed", err.to_string());
        err
    }

    fn notify_network_error(&self) {
        self.notifier.error(
            "Network Error",
            "Unable to connect to the server. Please check your connection.",
        );
    }

    // Auth endpoints

    pub async fn login(&self, data: &LoginRequest) -> Result<UserResponseWrapper> {
        self.request_json("/users/login", RequestOptions::post(), data).await
    }

    pub async fn register(&self, data: &RegisterRequest) -> Result<UserResponseWrapper> {
        self.request_json("/users", RequestOptions::post(), data).await
    }

    pub async fn get_current_user(&self) -> Result<UserResponseWrapper> {
        self.request("/user", RequestOptions::get()).await
    }

    pub async fn update_current_user(&self, data: &UpdateUserRequest) -> Result<UserResponseWrapper> {
        self.request_json("/user", RequestOptions::put(), data).await
    }

    // Article endpoints

    pub async fn get_articles(&self, params: &ArticleParams) -> Result<ArticlesResponse> {
        self.request("/articles", RequestOptions::get().query(params.to_query())).await
    }

    pub async fn get_feed(&self, params: &FeedParams) -> Result<ArticlesResponse> {
        self.request("/articles/feed", RequestOptions::get().query(params.to_query())).await
    }

    pub async fn get_article(&self, slug: &str) -> Result<ArticleResponseWrapper> {
        self.request(&format!("/articles/{}", encode(slug)), RequestOptions::get()).await
    }

    pub async fn create_article(&self, data: &CreateArticleRequest) -> Result<ArticleResponseWrapper> {
        self.request_json("/articles", RequestOptions::post(), data).await
    }

    pub async fn update_article(&self, slug: &str, data: &UpdateArticleRequest) -> Result<ArticleResponseWrapper> {
        self.request_json(&format!("/articles/{}", encode(slug)), RequestOptions::put(), data)
            .await
    }

    pub async fn delete_article(&self, slug: &str) -> Result<()> {
        self.request(&format!("/articles/{}", encode(slug)), RequestOptions::delete()).await
    }

    // Comment endpoints

    pub async fn get_comments(&self, slug: &str) -> Result<CommentsResponse> {
        self.request(&format!("/articles/{}/comments", encode(slug)), RequestOptions::get())
            .await
    }

    pub async fn create_comment(&self, slug: &str, data: &CreateCommentRequest) -> Result<CommentResponseWrapper> {
        self.request_json(&format!("/articles/{}/comments", encode(slug)), RequestOptions::post(), data)
            .await
    }

    pub async fn delete_comment(&self, slug: &str, comment_id: i64) -> Result<()> {
        self.request(
            &format!("/articles/{}/comments/{}", encode(slug), comment_id),
            RequestOptions::delete(),
        )
        .await
    }

    // Profile endpoints

    pub async fn get_profile(&self, username: &str) -> Result<ProfileResponseWrapper> {
        self.request(&format!("/profiles/{}", encode(username)), RequestOptions::get())
            .await
    }

    pub async fn follow_user(&self, username: &str) -> Result<ProfileResponseWrapper> {
        self.request(&format!("/profiles/{}/follow", encode(username)), RequestOptions::post())
            .await
    }

    pub async fn unfollow_user(&self, username: &str) -> Result<ProfileResponseWrapper> {
        self.request(&format!("/profiles/{}/follow", encode(username)), RequestOptions::delete())
            .await
    }

    pub async fn get_tags(&self) -> Result<TagsResponse> {
        self.request("/tags", RequestOptions::get()).await
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Pull `error` or `message` out of an error body, if it is JSON
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
