//! HTTP transport to the records backend
//!
//! The gateways talk to the backend through the [`Transport`] trait so the
//! request sequencing above it can be exercised without a server. The
//! production implementation is a blocking `reqwest` client; every call is a
//! single attempt with no retry.

use miette::Diagnostic;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP method used by the gateways
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request against the backend, relative to the configured base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Unencoded path segments, e.g. `["fields", "North 40"]`
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, segments: Vec<String>) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path for display and logging (segments joined, not encoded)
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

/// Errors raised while talking to the backend
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("Invalid API URL '{0}'")]
    #[diagnostic(
        code(fieldbook::transport::url),
        help("Set api_url in the config file or pass --api-url, e.g. http://localhost:3000")
    )]
    InvalidUrl(String),

    #[error("{request} failed: {message}")]
    #[diagnostic(
        code(fieldbook::transport::network),
        help("Check that the backend is running and reachable at the configured api_url")
    )]
    Network { request: String, message: String },

    #[error("{request} returned {status}: {message}")]
    #[diagnostic(code(fieldbook::transport::status))]
    Status {
        request: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {request}: {message}")]
    #[diagnostic(code(fieldbook::transport::decode))]
    Decode { request: String, message: String },
}

impl TransportError {
    /// HTTP status for application failures
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Sends one request and returns the decoded JSON body.
///
/// An empty response body decodes to `Value::Null`. Any non-2xx response is
/// an error.
pub trait Transport {
    fn execute(&self, request: &ApiRequest) -> Result<Value, TransportError>;
}

/// Blocking HTTP transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: reqwest::Url,
}

impl HttpTransport {
    /// Create a transport for the given base URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|_| TransportError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network {
                request: "client setup".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { client, base_url })
    }

    /// Build the full URL, percent-encoding each path segment
    fn url_for(&self, request: &ApiRequest) -> Result<reqwest::Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().extend(&request.segments);
        }
        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        let url = self.url_for(request)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        log::debug!("{} {}", request.method, url);

        let mut builder = self.client.request(method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| TransportError::Network {
            request: request.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().map_err(|e| TransportError::Network {
            request: request.to_string(),
            message: e.to_string(),
        })?;

        log::debug!("{} -> {}", request, status.as_u16());

        if !status.is_success() {
            return Err(TransportError::Status {
                request: request.to_string(),
                status: status.as_u16(),
                message: error_message(&text)
                    .or_else(|| status.canonical_reason().map(String::from))
                    .unwrap_or_else(|| "request failed".to_string()),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| TransportError::Decode {
            request: request.to_string(),
            message: e.to_string(),
        })
    }
}

/// Pull a readable message out of an error body.
///
/// Backends commonly answer `{"message": ...}` or `{"error": ...}`; anything
/// else is returned as raw text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error"] {
            match json.get(key) {
                Some(Value::String(s)) => return Some(s.clone()),
                Some(Value::Array(items)) => {
                    let parts: Vec<String> = items
                        .iter()
                        .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                        .collect();
                    return Some(parts.join("; "));
                }
                _ => {}
            }
        }
    }

    Some(trimmed.to_string())
}
