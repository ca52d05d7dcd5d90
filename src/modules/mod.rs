//! Cross-cutting services module
//!
//! Event hooks shared by the resolver and the account client.

pub mod events;

pub use events::{
    ChallengeEvent, DomainFallbackEvent, EventDispatcher, EventHandler, ExtractionFailureEvent,
    LanzouEvent, LoggingHandler, RequestEvent, ResolutionEvent,
};
