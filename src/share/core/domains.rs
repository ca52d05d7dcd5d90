//! Multi-domain request layer.
//!
//! The service's primary domain goes down from time to time; every logical
//! request is replayed against a fixed list of mirror domains until one of
//! them answers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use http::Method;
use http::header::HeaderMap;
use thiserror::Error;
use url::Url;

use crate::modules::events::{DomainFallbackEvent, EventDispatcher, LanzouEvent, RequestEvent};

use super::transport::{HttpRequest, HttpResponse, LanzouHttpClient, RequestBody};

/// Ordered candidate URLs for one logical request.
///
/// The caller-supplied URL always comes first; each mirror follows by
/// substituting the canonical domain. Duplicates are dropped, so a URL that
/// does not mention the canonical domain yields a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCandidateSet {
    candidates: Vec<Url>,
}

impl DomainCandidateSet {
    pub fn new(url: &Url, canonical_domain: &str, mirrors: &[String]) -> Self {
        let mut candidates = vec![url.clone()];
        if !canonical_domain.is_empty() && url.as_str().contains(canonical_domain) {
            for mirror in mirrors {
                let replaced = url.as_str().replace(canonical_domain, mirror);
                if let Ok(candidate) = Url::parse(&replaced)
                    && !candidates.contains(&candidate)
                {
                    candidates.push(candidate);
                }
            }
        }
        Self { candidates }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid request url '{0}'")]
    InvalidUrl(String),
    #[error("all {attempts} candidate domain(s) failed for {url}")]
    AllCandidatesFailed { url: String, attempts: usize },
}

/// Per-request knobs layered over the shared defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
    pub follow_redirects: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = Some(false);
        self
    }
}

/// Request layer that retries one logical request across mirror domains.
#[derive(Clone)]
pub struct MultiDomainHttp {
    transport: Arc<dyn LanzouHttpClient>,
    events: Arc<EventDispatcher>,
    base_headers: HeaderMap,
    canonical_domain: String,
    mirrors: Vec<String>,
    timeout: Duration,
}

impl MultiDomainHttp {
    pub fn new(
        transport: Arc<dyn LanzouHttpClient>,
        events: Arc<EventDispatcher>,
        base_headers: HeaderMap,
        canonical_domain: impl Into<String>,
        mirrors: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            events,
            base_headers,
            canonical_domain: canonical_domain.into(),
            mirrors,
            timeout,
        }
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn candidates(&self, url: &Url) -> DomainCandidateSet {
        DomainCandidateSet::new(url, &self.canonical_domain, &self.mirrors)
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<HttpResponse, HttpError> {
        self.request(Method::GET, url, RequestBody::Empty, options).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        self.request(Method::POST, url, body, options).await
    }

    /// Issue `method` against every candidate URL in order.
    ///
    /// GET succeeds on any response that arrives; POST additionally needs
    /// HTTP 200 and a non-empty body.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<HttpResponse, HttpError> {
        let parsed = Url::parse(url).map_err(|_| HttpError::InvalidUrl(url.to_string()))?;
        let candidates = self.candidates(&parsed);

        let mut headers = self.base_headers.clone();
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let template = HttpRequest::new(
            method.clone(),
            parsed.clone(),
            options.timeout.unwrap_or(self.timeout),
        )
        .with_headers(headers)
        .with_body(body)
        .with_follow_redirects(options.follow_redirects.unwrap_or(true));

        for candidate in candidates.iter() {
            let request = template.retarget(candidate.clone());
            self.events.dispatch(LanzouEvent::Request(RequestEvent {
                url: candidate.clone(),
                method: method.clone(),
                timestamp: Utc::now(),
            }));

            let failure = match self.transport.execute(&request).await {
                Ok(response) if method != Method::POST => return Ok(response),
                Ok(response) if response.status == 200 && !response.body.is_empty() => {
                    return Ok(response);
                }
                Ok(response) => format!("status {} with {} byte body", response.status, response.body.len()),
                Err(err) => err.to_string(),
            };

            self.events
                .dispatch(LanzouEvent::DomainFallback(DomainFallbackEvent {
                    url: candidate.clone(),
                    method: method.clone(),
                    error: failure,
                    timestamp: Utc::now(),
                }));
        }

        Err(HttpError::AllCandidatesFailed {
            url: url.to_string(),
            attempts: candidates.len(),
        })
    }

    /// Install a cookie for `url` and all of its mirror variants.
    pub fn set_cookie(&self, url: &Url, name: &str, value: &str) {
        for candidate in self.candidates(url).iter() {
            self.transport.set_cookie(candidate, name, value);
        }
    }

    pub fn remove_cookie(&self, url: &Url, name: &str) {
        for candidate in self.candidates(url).iter() {
            self.transport.remove_cookie(candidate, name);
        }
    }
}
