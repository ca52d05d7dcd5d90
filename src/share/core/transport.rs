//! Transport abstraction used by every Lanzou request.
//!
//! The resolver and the account operations never talk to `reqwest` directly;
//! they go through [`LanzouHttpClient`] so tests can script the remote side.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use http::header::{HeaderMap, LOCATION};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Contract implemented by the concrete HTTP transport.
///
/// Implementations must keep a single cookie jar for their whole lifetime so
/// cookies installed through [`LanzouHttpClient::set_cookie`] and cookies
/// returned by the service are sent on later requests.
#[async_trait]
pub trait LanzouHttpClient: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    fn set_cookie(&self, url: &Url, name: &str, value: &str);

    fn remove_cookie(&self, url: &Url, name: &str);
}

/// Body attached to an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
}

impl RequestBody {
    pub fn form<K, V, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        match self {
            RequestBody::Form(fields) => fields
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// One multipart field. File parts keep their bytes in memory so the same
/// body can be replayed against every mirror domain.
#[derive(Debug, Clone)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        data: Bytes,
    },
}

/// Fully described request, replayable across mirror domains.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Duration,
    pub follow_redirects: bool,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url, timeout: Duration) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout,
            follow_redirects: true,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Same request aimed at another absolute URL.
    pub fn retarget(&self, url: Url) -> Self {
        let mut next = self.clone();
        next.url = url;
        next
    }
}

/// Minimal response representation returned by the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
