//! Share link resolution.
//!
//! Layers, bottom-up: `core` (transport, mirror fallback, shared types),
//! `cleaner` and `extractors` (page text handling), `solvers` (anti-bot and
//! download verification), and `resolver` which strings them together.

pub mod cleaner;
pub mod core;
pub mod extractors;
pub mod resolver;
pub mod solvers;
pub mod url;
pub mod user_agents;

pub use cleaner::strip_comments;
pub use core::{
    DomainCandidateSet, ExtractedMetadata, HttpError, HttpRequest, HttpResponse, LanzouHttpClient,
    MultiDomainHttp, MultipartField, PageSnapshot, ReqwestLanzouClient, RequestBody,
    RequestOptions, ResolutionResult, ShareRequest, ShareStatus, TransportError,
};
pub use extractors::{ExtractionError, PatternChain, SignedRequest, WebpageParams};
pub use resolver::ShareResolver;
pub use solvers::{AcwScV2Solver, ChallengeSolver, DownloadVerification};
pub use url::{ShareUrlKind, classify_share_url};
