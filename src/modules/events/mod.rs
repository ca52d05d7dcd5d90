//! Event system for the resolver and account layers.
//!
//! Provides hooks for logging and custom reactions around request, fallback,
//! challenge, and resolution activity.

use chrono::{DateTime, Utc};
use http::Method;
use std::sync::Arc;
use url::Url;

use crate::share::core::ShareStatus;

/// Emitted before each attempt against one candidate URL.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub url: Url,
    pub method: Method,
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a candidate URL failed and the next mirror will be tried.
#[derive(Debug, Clone)]
pub struct DomainFallbackEvent {
    pub url: Url,
    pub method: Method,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChallengeEvent {
    pub url: String,
    pub challenge_type: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResolutionEvent {
    pub share_url: String,
    pub status: ShareStatus,
    pub timestamp: DateTime<Utc>,
}

/// A page did not contain a field the resolver needed.
#[derive(Debug, Clone)]
pub struct ExtractionFailureEvent {
    pub url: String,
    pub field: String,
    /// Leading part of the offending page.
    pub excerpt: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum LanzouEvent {
    Request(RequestEvent),
    DomainFallback(DomainFallbackEvent),
    Challenge(ChallengeEvent),
    Resolution(ResolutionEvent),
    ExtractionFailure(ExtractionFailureEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &LanzouEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: LanzouEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &LanzouEvent) {
        match event {
            LanzouEvent::Request(request) => {
                log::debug!("-> {} {}", request.method, request.url);
            }
            LanzouEvent::DomainFallback(fallback) => {
                log::warn!(
                    "{} {} failed, trying next domain: {}",
                    fallback.method,
                    fallback.url,
                    fallback.error
                );
            }
            LanzouEvent::Challenge(challenge) => {
                log::info!(
                    "challenge {} ({}) success={}",
                    challenge.url,
                    challenge.challenge_type,
                    challenge.success
                );
            }
            LanzouEvent::Resolution(resolution) => {
                if resolution.status.is_success() {
                    log::info!("resolved {}", resolution.share_url);
                } else {
                    log::warn!("{} -> {}", resolution.share_url, resolution.status);
                }
            }
            LanzouEvent::ExtractionFailure(failure) => {
                log::error!(
                    "no '{}' on {}, page starts with: {}",
                    failure.field,
                    failure.url,
                    failure.excerpt
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &LanzouEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher.dispatch(LanzouEvent::Resolution(ResolutionEvent {
            share_url: "https://pan.lanzouo.com/iAbc123".into(),
            status: ShareStatus::ShareRevoked,
            timestamp: Utc::now(),
        }));
        assert_eq!(*counter.0.lock().unwrap(), 1);
    }
}
