//! API base URL selection

/// Path prefix every API route lives under.
pub const API_PATH: &str = "/api";

/// Origin of the local development server that proxies `/api`.
pub const DEFAULT_PROXY_ORIGIN: &str = "http://localhost:5173";

/// Origin of the deployed backend when none is configured.
pub const DEFAULT_PRODUCTION_ORIGIN: &str = "https://d2tf8154vacbrr.cloudfront.net";

/// Where the client believes it is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeContext {
    /// Served to a browser from `hostname`.
    Browser { hostname: String },
    /// No page context (tests, CLIs, server-side rendering).
    Detached,
}

impl RuntimeContext {
    pub fn browser(hostname: impl Into<String>) -> Self {
        Self::Browser {
            hostname: hostname.into(),
        }
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::Detached
    }
}

/// Pick the API base URL for `context`.
///
/// `localhost` and detached contexts go through the development proxy; any
/// other host talks to the production origin.
pub fn resolve(context: &RuntimeContext, proxy_origin: &str, production_origin: Option<&str>) -> String {
    let origin = match context {
        RuntimeContext::Browser { hostname } if hostname == "localhost" => {
            log::info!("Using localhost development proxy: {}", proxy_origin);
            proxy_origin
        }
        RuntimeContext::Browser { .. } => {
            let origin = production_origin.unwrap_or(DEFAULT_PRODUCTION_ORIGIN);
            log::info!("Using production API origin: {}", origin);
            origin
        }
        RuntimeContext::Detached => {
            log::info!("No page context, using proxy origin: {}", proxy_origin);
            proxy_origin
        }
    };

    format!("{}{}", origin.trim_end_matches('/'), API_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_uses_proxy() {
        let url = resolve(&RuntimeContext::browser("localhost"), DEFAULT_PROXY_ORIGIN, Some("https://api.example.com"));
        assert_eq!(url, "http://localhost:5173/api");
    }

    #[test]
    fn test_remote_host_uses_configured_origin() {
        let url = resolve(&RuntimeContext::browser("conduit.example.com"), DEFAULT_PROXY_ORIGIN, Some("https://api.example.com/"));
        assert_eq!(url, "https://api.example.com/api");
    }

    #[test]
    fn test_remote_host_falls_back_to_default_origin() {
        let url = resolve(&RuntimeContext::browser("conduit.example.com"), DEFAULT_PROXY_ORIGIN, None);
        assert_eq!(url, "https://d2tf8154vacbrr.cloudfront.net/api");
    }

    #[test]
    fn test_detached_uses_proxy() {
        let url = resolve(&RuntimeContext::Detached, "http://127.0.0.1:9000", Some("https://api.example.com"));
        assert_eq!(url, "http://127.0.0.1:9000/api");
    }
}
