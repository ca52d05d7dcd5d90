//! # lanzou-rs
//!
//! Resolve Lanzou cloud share links into direct download URLs, and manage
//! the files of a Lanzou account.
//!
//! Share pages hide the download behind a rotating set of obstacles: an
//! `acw_sc__v2` anti-bot cookie challenge, commented-out decoy code, an
//! optional password gate, a signed ajax request, a pre-redirect link and
//! sometimes a download verification page. [`LanzouClient::resolve`] walks
//! through all of them and reports a closed [`ShareStatus`].
//!
//! ## Features
//!
//! - Mirror domain fallback for every request
//! - Pure Rust `acw_sc__v2` solver, no JavaScript engine
//! - Password protected and custom/VIP share links
//! - Account operations: listing, sharing, passwords, upload, delete
//! - Event hooks for requests, fallbacks, challenges and failures
//!
//! ## Example
//!
//! ```no_run
//! use lanzou_rs::LanzouClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LanzouClient::new()?;
//!     let result = client.resolve("https://pan.lanzouo.com/iAbc123", "").await;
//!     println!("{}: {:?}", result.status(), result.direct_url());
//!     Ok(())
//! }
//! ```

mod lanzou;

pub mod account;
pub mod modules;
pub mod share;

pub use crate::lanzou::{
    LanzouClient,
    LanzouClientBuilder,
    LanzouConfig,
    LanzouError,
    LanzouResult,
};

pub use crate::account::{
    AccountError,
    AccountResult,
    AccountSettings,
    Folder,
    ItemKind,
    LanzouAccount,
    LanzouCookie,
    RemoteFile,
    ShareInfo,
};

pub use crate::share::{
    AcwScV2Solver,
    ChallengeSolver,
    DomainCandidateSet,
    DownloadVerification,
    ExtractedMetadata,
    HttpError,
    HttpRequest,
    HttpResponse,
    LanzouHttpClient,
    MultiDomainHttp,
    MultipartField,
    PageSnapshot,
    ReqwestLanzouClient,
    RequestBody,
    RequestOptions,
    ResolutionResult,
    ShareRequest,
    ShareResolver,
    ShareStatus,
    ShareUrlKind,
    TransportError,
    classify_share_url,
    strip_comments,
};

pub use crate::modules::{
    ChallengeEvent,
    DomainFallbackEvent,
    EventDispatcher,
    EventHandler,
    ExtractionFailureEvent,
    LanzouEvent,
    LoggingHandler,
    RequestEvent,
    ResolutionEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
