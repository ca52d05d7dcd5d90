//! Download verification step.
//!
//! When the pre-redirect link trips the service's traffic check, it serves a
//! "网络异常" page instead of a 302. That page carries a `file`/`sign` pair
//! which must be posted to the verification endpoint, after a short wait, to
//! obtain the real download URL.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ChallengeSolver;

/// Marker text of the verification page.
pub const VERIFICATION_MARKER: &str = "网络异常";

static FILE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'file':'(.+?)'").unwrap());
static SIGN_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'sign':'(.+?)'").unwrap());

/// Tokens scraped from the verification page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationTokens {
    pub file: String,
    pub sign: String,
}

impl VerificationTokens {
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("file".to_string(), self.file.clone()),
            ("el".to_string(), "2".to_string()),
            ("sign".to_string(), self.sign.clone()),
        ]
    }
}

/// Recognises the verification page and prepares its submission.
#[derive(Debug, Clone)]
pub struct DownloadVerification {
    delay: Duration,
}

impl DownloadVerification {
    /// `delay` is how long to wait before posting; posting earlier makes the
    /// service answer with a signature timing error.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_verification_page(&self, cleaned_html: &str) -> bool {
        cleaned_html.contains(VERIFICATION_MARKER)
    }

    pub fn parse_tokens(&self, cleaned_html: &str) -> Option<VerificationTokens> {
        let file = first_capture(&FILE_TOKEN_RE, cleaned_html)?;
        let sign = first_capture(&SIGN_TOKEN_RE, cleaned_html)?;
        Some(VerificationTokens { file, sign })
    }
}

impl ChallengeSolver for DownloadVerification {
    fn name(&self) -> &'static str {
        "download_verification"
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
