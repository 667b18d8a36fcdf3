//! Request description and assembly for the gateway

use crate::error::ApiError;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder,
};
use serde::Serialize;
use url::Url;

/// Method, extra headers, query and body of a single API call
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Add a header; caller headers override the default content type.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Serialize `body` as the JSON request body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }
}

/// Compose the final request: JSON content type, then caller headers, then
/// the bearer token when one is set.
pub(crate) fn build(
    client: &Client,
    url: &str,
    options: &RequestOptions,
    token: Option<&str>,
) -> Result<RequestBuilder, ApiError> {
    let mut url = Url::parse(url)?;

    if !options.query.is_empty() {
        let mut query_pairs = url.query_pairs_mut();
        for (key, value) in &options.query {
            query_pairs.append_pair(key, value);
        }
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &options.headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => log::warn!("Skipping invalid header {:?}", name),
        }
    }

    if let Some(token) = token {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
    }

    let mut req = client.request(options.method.clone(), url.as_str()).headers(headers);

    if let Some(body) = &options.body {
        req = req.body(body.clone());
    }

    Ok(req)
}
