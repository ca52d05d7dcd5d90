//! Core utilities shared by the fetch layer, solvers, extractors, and resolver.

pub mod domains;
pub mod reqwest_client;
pub mod transport;
pub mod types;

pub use domains::{DomainCandidateSet, HttpError, MultiDomainHttp, RequestOptions};
pub use reqwest_client::ReqwestLanzouClient;
pub use transport::{
    HttpRequest, HttpResponse, LanzouHttpClient, MultipartField, RequestBody, TransportError,
};
pub use types::{ExtractedMetadata, PageSnapshot, ResolutionResult, ShareRequest, ShareStatus};
