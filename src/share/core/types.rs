//! Data structures shared by the fetch, extraction, and resolution layers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::share::cleaner::strip_comments;
use crate::share::extractors::normalize::{DEFAULT_SIZE, UNMATCHED_NAME, today_string};

/// Share link plus the optional extraction password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRequest {
    pub share_url: String,
    #[serde(default)]
    pub password: String,
}

impl ShareRequest {
    pub fn new(share_url: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            share_url: share_url.into(),
            password: password.into(),
        }
    }

    /// `true` when the link carries the `webpage=` query parameter that
    /// switches the signed request into extra-parameter mode.
    pub fn wants_webpage_params(&self) -> bool {
        self.share_url.contains("?webpage=")
    }
}

/// A fetched page together with its comment-stripped rendition.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    raw_html: String,
    cleaned_html: String,
}

impl PageSnapshot {
    pub fn new(raw_html: impl Into<String>) -> Self {
        let raw_html = raw_html.into();
        let cleaned_html = strip_comments(&raw_html);
        Self {
            raw_html,
            cleaned_html,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw_html
    }

    pub fn cleaned(&self) -> &str {
        &self.cleaned_html
    }
}

/// File details scraped from the share pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub name: String,
    pub size: String,
    /// Upload date, `YYYY-MM-DD` whenever the page used a known format.
    pub upload_time: String,
    pub description: String,
    pub file_type: String,
    pub signed_token: Option<String>,
    pub anti_bot_cookie: Option<String>,
}

impl ExtractedMetadata {
    pub(crate) fn set_name(&mut self, name: String) {
        self.file_type = file_type_of(&name);
        self.name = name;
    }
}

impl Default for ExtractedMetadata {
    fn default() -> Self {
        Self {
            name: UNMATCHED_NAME.to_string(),
            size: DEFAULT_SIZE.to_string(),
            upload_time: today_string(),
            description: String::new(),
            file_type: String::new(),
            signed_token: None,
            anti_bot_cookie: None,
        }
    }
}

/// Text after the last dot; a name without a dot is its own type.
pub(crate) fn file_type_of(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_string()
}

/// Terminal classification of a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShareStatus {
    Success,
    InvalidUrl,
    NetworkError,
    SharePasswordRequired,
    SharePasswordWrong,
    ShareRevoked,
    ExtractionFailed,
}

impl ShareStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ShareStatus::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShareStatus::Success => "success",
            ShareStatus::InvalidUrl => "invalid share url",
            ShareStatus::NetworkError => "network error",
            ShareStatus::SharePasswordRequired => "share password required",
            ShareStatus::SharePasswordWrong => "share password wrong",
            ShareStatus::ShareRevoked => "share revoked",
            ShareStatus::ExtractionFailed => "extraction failed",
        }
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`crate::ShareResolver::resolve`].
///
/// The status is `Success` exactly when a non-empty direct URL is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    status: ShareStatus,
    metadata: Option<ExtractedMetadata>,
    direct_url: Option<String>,
}

impl ResolutionResult {
    /// Build a successful result. An empty URL downgrades the result to
    /// `ExtractionFailed`.
    pub fn resolved(metadata: ExtractedMetadata, direct_url: String) -> Self {
        if direct_url.is_empty() {
            return Self::failed(ShareStatus::ExtractionFailed, Some(metadata));
        }
        Self {
            status: ShareStatus::Success,
            metadata: Some(metadata),
            direct_url: Some(direct_url),
        }
    }

    /// Build a failed result. Passing `Success` here is a logic error and is
    /// recorded as `ExtractionFailed`.
    pub fn failed(status: ShareStatus, metadata: Option<ExtractedMetadata>) -> Self {
        let status = if status.is_success() {
            ShareStatus::ExtractionFailed
        } else {
            status
        };
        Self {
            status,
            metadata,
            direct_url: None,
        }
    }

    pub fn status(&self) -> ShareStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn metadata(&self) -> Option<&ExtractedMetadata> {
        self.metadata.as_ref()
    }

    pub fn direct_url(&self) -> Option<&str> {
        self.direct_url.as_deref()
    }

    pub fn into_direct_url(self) -> Option<String> {
        self.direct_url
    }
}
