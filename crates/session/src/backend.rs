use async_trait::async_trait;
use conduit_gateway::types::UserResponseWrapper;
use conduit_gateway::{ApiClient, ApiError, InvalidationListener};
use std::sync::Weak;

/// The part of the gateway the session store drives
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Replace the bearer token attached to future requests
    fn set_token(&self, token: Option<String>);

    /// Register the store as the single invalidation listener
    fn set_invalidation_listener(&self, listener: Weak<dyn InvalidationListener>);

    /// Validate the current token by fetching its user
    async fn get_current_user(&self) -> Result<UserResponseWrapper, ApiError>;
}

#[async_trait]
impl SessionBackend for ApiClient {
    fn set_token(&self, token: Option<String>) {
        ApiClient::set_token(self, token);
    }

    fn set_invalidation_listener(&self, listener: Weak<dyn InvalidationListener>) {
        ApiClient::set_invalidation_listener(self, listener);
    }

    async fn get_current_user(&self) -> Result<UserResponseWrapper, ApiError> {
        ApiClient::get_current_user(self).await
    }
}
