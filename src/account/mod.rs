//! Authenticated account operations.
//!
//! Everything here talks to the `doupload.php` task endpoint of the account
//! site with the session cookies installed by
//! [`crate::LanzouClientBuilder::with_cookies`]. Replies are JSON objects
//! whose `zt` flag is `1` on success.

pub mod disk;
pub mod types;
pub mod upload;

use std::path::PathBuf;
use std::time::Duration;

use http::header::{ORIGIN, REFERER};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::share::core::{HttpError, MultiDomainHttp, RequestBody, RequestOptions};
use crate::share::resolver::ShareResolver;

pub use types::{Folder, ItemKind, LanzouCookie, RemoteFile, ShareInfo};
pub use upload::{ALLOWED_SUFFIXES, is_name_allowed, sanitize_name};

use types::{is_flag_set, value_to_string};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account cookies are missing: PHPSESSID, ylogin and phpdisk_info are all required")]
    MissingCookies,
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("unexpected reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rejected by the service: {0}")]
    Rejected(String),
    #[error("no file or folder with id {0}")]
    InvalidId(String),
    #[error("password must be {min}-{max} characters, got {len}")]
    PasswordLength { min: usize, max: usize, len: usize },
    #[error("file type of '{0}' is not accepted for upload")]
    NameNotAllowed(String),
    #[error("{} is {size} bytes, above the {limit} byte upload limit", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Account endpoints and limits, derived from the client configuration.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub base_url: Url,
    /// `ylogin` cookie value, sent as `uid` by some tasks.
    pub uid: String,
    pub upload_timeout: Duration,
    pub max_upload_size: u64,
}

impl AccountSettings {
    fn endpoint(&self, path: &str) -> AccountResult<String> {
        self.base_url
            .join(path)
            .map(String::from)
            .map_err(|err| AccountError::Http(HttpError::InvalidUrl(format!("{path}: {err}"))))
    }

    fn doupload_url(&self) -> AccountResult<String> {
        self.endpoint("doupload.php")
    }
}

/// Handle for the authenticated operations of one client.
pub struct LanzouAccount<'a> {
    http: &'a MultiDomainHttp,
    resolver: &'a ShareResolver,
    settings: &'a AccountSettings,
}

impl<'a> LanzouAccount<'a> {
    pub fn new(
        http: &'a MultiDomainHttp,
        resolver: &'a ShareResolver,
        settings: &'a AccountSettings,
    ) -> Self {
        Self {
            http,
            resolver,
            settings,
        }
    }

    pub fn settings(&self) -> &AccountSettings {
        self.settings
    }

    fn options(&self) -> RequestOptions {
        let origin = self.settings.base_url.as_str().trim_end_matches('/').to_string();
        let referer = format!("{origin}/mydisk.php");
        RequestOptions::new()
            .with_header(REFERER, &referer)
            .with_header(ORIGIN, &origin)
    }

    /// POST one task and return the decoded reply.
    async fn post_task<K, V, I>(&self, url: &str, fields: I) -> AccountResult<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let response = self
            .http
            .post(url, RequestBody::form(fields), self.options())
            .await?;
        Ok(response.json::<Value>()?)
    }

    /// POST one task and require `zt == 1`.
    async fn post_checked<K, V, I>(&self, fields: I) -> AccountResult<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let url = self.settings.doupload_url()?;
        let reply = self.post_task(&url, fields).await?;
        ensure_ok(&reply)?;
        Ok(reply)
    }
}

fn ensure_ok(reply: &Value) -> AccountResult<()> {
    if is_flag_set(&reply["zt"]) {
        Ok(())
    } else {
        Err(AccountError::Rejected(value_to_string(&reply["info"])))
    }
}
