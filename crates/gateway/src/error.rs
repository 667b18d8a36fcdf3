use thiserror::Error;

/// Failure classes surfaced by [`crate::ApiClient::request`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// The stored token was already expired (or undecodable); no request was sent.
    #[error("Token expired")]
    AuthExpired,

    /// The server answered 401 to a request that carried a token.
    #[error("Authentication failed")]
    AuthRejected,

    /// No response was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-success response.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A success response whose body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// True for the two variants that invalidate the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthExpired | Self::AuthRejected)
    }

    /// HTTP status of the failing response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::AuthRejected => Some(401),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
