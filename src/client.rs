use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::scenario::HttpMethod;

/// Per-call timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a request never produced a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// Issues a single HTTP request and reports its status code.
///
/// Any response counts as `Ok`, whatever its status class. Implementations
/// must bound each call so one hung request cannot stall a virtual user.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&serde_json::Value>,
    ) -> Result<u16, TransportError>;
}

/// [`HttpClient`] backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&serde_json::Value>,
    ) -> Result<u16, TransportError> {
        let mut request = self.inner.request(method.into(), url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        // Plain strings go out verbatim, anything else as JSON.
        request = match body {
            Some(serde_json::Value::String(raw)) => request.body(raw.clone()),
            Some(value) => request.json(value),
            None => request,
        };

        let response = request.send().await?;
        Ok(response.status().as_u16())
    }
}
