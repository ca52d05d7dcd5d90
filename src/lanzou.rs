//! High level client.
//!
//! Owns the configuration, the transport with its cookie jar, the mirror
//! fallback layer and the share resolver, and hands out account handles
//! when session cookies are configured.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::account::{AccountError, AccountSettings, LanzouAccount, LanzouCookie};
use crate::modules::events::{EventDispatcher, EventHandler, LoggingHandler};
use crate::share::core::{
	LanzouHttpClient, MultiDomainHttp, ReqwestLanzouClient, ResolutionResult, ShareRequest,
	TransportError,
};
use crate::share::resolver::ShareResolver;
use crate::share::user_agents::random_desktop_user_agent;

/// Result alias used by client construction.
pub type LanzouResult<T> = Result<T, LanzouError>;

/// Errors raised while building a client or loading its configuration.
#[derive(Debug, Error)]
pub enum LanzouError {
	#[error("transport initialisation failed: {0}")]
	Transport(#[from] TransportError),
	#[error("url parse error: {0}")]
	Url(#[from] url::ParseError),
	#[error("header conversion failed: {0}")]
	InvalidHeader(String),
	#[error("config io error: {0}")]
	Io(#[from] std::io::Error),
	#[error("config parse error: {0}")]
	Config(#[from] serde_json::Error),
}

/// Client configuration. Every field has a default, so a JSON file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanzouConfig {
	pub host_url: String,
	pub canonical_domain: String,
	pub mirror_domains: Vec<String>,
	pub account_base_url: String,
	pub verification_url: String,
	pub request_timeout_secs: u64,
	pub upload_timeout_secs: u64,
	pub verification_delay_ms: u64,
	/// Picked at random from a desktop browser list when unset.
	pub user_agent: Option<String>,
	pub accept_language: String,
	pub max_upload_size: u64,
	pub cookies: Option<LanzouCookie>,
}

impl Default for LanzouConfig {
	fn default() -> Self {
		Self {
			host_url: "https://pan.lanzouo.com".to_string(),
			canonical_domain: "lanzouo.com".to_string(),
			mirror_domains: vec![
				"lanzouw.com".to_string(),
				"lanzoui.com".to_string(),
				"lanzoux.com".to_string(),
			],
			account_base_url: "https://pc.woozooo.com".to_string(),
			verification_url: "https://vip.d0.baidupan.com/file/ajax.php".to_string(),
			request_timeout_secs: 15,
			upload_timeout_secs: 3600,
			verification_delay_ms: 2000,
			user_agent: None,
			accept_language: "zh-CN,zh;q=0.9".to_string(),
			max_upload_size: 100 * 1024 * 1024,
			cookies: None,
		}
	}
}

impl LanzouConfig {
	pub fn from_json_str(raw: &str) -> LanzouResult<Self> {
		Ok(serde_json::from_str(raw)?)
	}

	pub fn from_json_file(path: impl AsRef<Path>) -> LanzouResult<Self> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_json_str(&raw)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn upload_timeout(&self) -> Duration {
		Duration::from_secs(self.upload_timeout_secs)
	}

	pub fn verification_delay(&self) -> Duration {
		Duration::from_millis(self.verification_delay_ms)
	}
}

/// Fluent builder for [`LanzouClient`].
pub struct LanzouClientBuilder {
	config: LanzouConfig,
	transport: Option<Arc<dyn LanzouHttpClient>>,
	handlers: Vec<Arc<dyn EventHandler>>,
}

impl LanzouClientBuilder {
	pub fn new() -> Self {
		Self {
			config: LanzouConfig::default(),
			transport: None,
			handlers: Vec::new(),
		}
	}

	pub fn with_config(mut self, config: LanzouConfig) -> Self {
		self.config = config;
		self
	}

	/// Session cookies of a logged-in account; enables [`LanzouClient::account`].
	pub fn with_cookies(mut self, cookies: LanzouCookie) -> Self {
		self.config.cookies = Some(cookies);
		self
	}

	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = Some(user_agent.into());
		self
	}

	pub fn with_host_url(mut self, host_url: impl Into<String>) -> Self {
		self.config.host_url = host_url.into();
		self
	}

	pub fn with_mirror_domains<I, S>(mut self, mirrors: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.config.mirror_domains = mirrors.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout_secs = timeout.as_secs().max(1);
		self
	}

	pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
		self.config.upload_timeout_secs = timeout.as_secs().max(1);
		self
	}

	pub fn with_verification_delay(mut self, delay: Duration) -> Self {
		self.config.verification_delay_ms = delay.as_millis() as u64;
		self
	}

	/// Replace the reqwest transport, e.g. with a scripted one in tests.
	pub fn with_transport(mut self, transport: Arc<dyn LanzouHttpClient>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Register an event handler next to the default [`LoggingHandler`].
	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn build(self) -> LanzouResult<LanzouClient> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestLanzouClient::new()?),
		};
		LanzouClient::with_parts(self.config, transport, self.handlers)
	}
}

impl Default for LanzouClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Share resolver and account entry point.
pub struct LanzouClient {
	config: LanzouConfig,
	resolver: ShareResolver,
	account_settings: Option<AccountSettings>,
}

impl LanzouClient {
	/// Construct a client with default configuration.
	pub fn new() -> LanzouResult<Self> {
		LanzouClientBuilder::new().build()
	}

	/// Obtain a builder to customise the client instance.
	pub fn builder() -> LanzouClientBuilder {
		LanzouClientBuilder::new()
	}

	fn with_parts(
		config: LanzouConfig,
		transport: Arc<dyn LanzouHttpClient>,
		handlers: Vec<Arc<dyn EventHandler>>,
	) -> LanzouResult<Self> {
		let host_url = Url::parse(&config.host_url)?;
		let account_base = Url::parse(&config.account_base_url)?;
		let base_headers = base_headers(&config)?;

		let mut events = EventDispatcher::new();
		events.register_handler(Arc::new(LoggingHandler));
		for handler in handlers {
			events.register_handler(handler);
		}

		let http = MultiDomainHttp::new(
			transport,
			Arc::new(events),
			base_headers,
			config.canonical_domain.clone(),
			config.mirror_domains.clone(),
			config.request_timeout(),
		);

		let account_settings = match &config.cookies {
			Some(cookies) if cookies.is_complete() => {
				for (name, value) in cookies.pairs() {
					http.set_cookie(&account_base, name, value);
				}
				Some(AccountSettings {
					base_url: account_base,
					uid: cookies.ylogin.clone(),
					upload_timeout: config.upload_timeout(),
					max_upload_size: config.max_upload_size,
				})
			}
			Some(_) => {
				log::warn!("incomplete account cookies ignored");
				None
			}
			None => None,
		};

		let resolver = ShareResolver::new(
			http,
			host_url,
			config.verification_url.clone(),
			config.verification_delay(),
		);

		Ok(Self {
			config,
			resolver,
			account_settings,
		})
	}

	pub fn config(&self) -> &LanzouConfig {
		&self.config
	}

	/// Resolve a share link. An empty `password` means none is known.
	pub async fn resolve(&self, share_url: &str, password: &str) -> ResolutionResult {
		self.resolve_request(&ShareRequest::new(share_url, password)).await
	}

	pub async fn resolve_request(&self, request: &ShareRequest) -> ResolutionResult {
		self.resolver.resolve(request).await
	}

	/// Direct download URL of a share, or `None` on any failure.
	pub async fn direct_url(&self, share_url: &str, password: &str) -> Option<String> {
		self.resolve(share_url, password).await.into_direct_url()
	}

	/// Handle for authenticated operations; needs complete session cookies.
	pub fn account(&self) -> Result<LanzouAccount<'_>, AccountError> {
		let settings = self
			.account_settings
			.as_ref()
			.ok_or(AccountError::MissingCookies)?;
		Ok(LanzouAccount::new(self.resolver.http(), &self.resolver, settings))
	}
}

fn base_headers(config: &LanzouConfig) -> LanzouResult<HeaderMap> {
	let user_agent = config
		.user_agent
		.as_deref()
		.unwrap_or_else(|| random_desktop_user_agent());

	let mut headers = HeaderMap::new();
	headers.insert(USER_AGENT, header_value(user_agent)?);
	headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
	headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
	Ok(headers)
}

fn header_value(value: &str) -> LanzouResult<HeaderValue> {
	HeaderValue::from_str(value).map_err(|err| LanzouError::InvalidHeader(format!("{value:?}: {err}")))
}
