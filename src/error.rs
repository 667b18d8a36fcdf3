//! Error handling for the Conduit client

use conduit_gateway::ApiError;
use std::fmt;
use thiserror::Error;

/// Unified error type for the Conduit client
#[derive(Error, Debug)]
pub enum Error {
    /// Errors classified by the request gateway
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Form input rejected before any request was made
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// An authenticated query was attempted before the token was confirmed
    #[error("Session is not ready for authenticated requests")]
    SessionNotReady,

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(field: &'static str, msg: T) -> Self {
        Error::Validation {
            field,
            message: msg.to_string(),
        }
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether the gateway gave up on the session
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Api(err) if err.is_auth_failure())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
