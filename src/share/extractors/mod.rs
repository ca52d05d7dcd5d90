//! Pattern-based extraction of share page fields.
//!
//! The share pages went through many layout revisions and old layouts are
//! still served for old shares. Every field is therefore described by an
//! ordered [`PatternChain`]: patterns are tried in order and the first one
//! that matches wins.

pub mod normalize;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::share::core::ExtractedMetadata;

use normalize::{normalize_name, normalize_size, normalize_time};

/// Ordered list of single-capture patterns for one field.
#[derive(Debug, Clone)]
pub struct PatternChain {
    field: &'static str,
    patterns: Vec<Regex>,
}

impl PatternChain {
    fn new(field: &'static str, raw_patterns: &[&str]) -> Self {
        let patterns = raw_patterns
            .iter()
            .map(|pattern| build_regex(pattern))
            .collect();
        Self { field, patterns }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Capture group 1 of the first pattern that matches.
    pub fn first_match<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.patterns
            .iter()
            .find_map(|re| re.captures(text).and_then(|caps| caps.get(1)))
            .map(|m| m.as_str())
    }
}

fn build_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid extraction pattern {pattern}: {err}"))
}

pub static NAME_PATTERNS: Lazy<PatternChain> = Lazy::new(|| {
    PatternChain::new(
        "name",
        &[
            r"<title>(.+?) - 蓝奏云</title>",
            r#"<div class="filethetext".+?>([^<>]+?)</div>"#,
            r#"<div style="font-size.+?>([^<>].+?)</div>"#,
            r"var filename = '(.+?)';",
            r#"id="filenajax">(.+?)</div>"#,
            r#"<div class="b"><span>([^<>]+?)</span></div>"#,
        ],
    )
});

pub static TIME_PATTERNS: Lazy<PatternChain> = Lazy::new(|| {
    PatternChain::new(
        "time",
        &[r">(\d+\s?[秒天分小][钟时]?前|[昨前]天\s?[\d:]+?|\d+\s?天前|\d{4}-\d\d-\d\d)<"],
    )
});

pub static SIZE_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("size", &[r"大小.+?(\d[\d.,]+\s?[BKM]?)<"]));

pub static DESC_PATTERNS: Lazy<PatternChain> = Lazy::new(|| {
    PatternChain::new("description", &[r"文件描述.+?<br>\n?\s*(.*?)\s*</td>"])
});

/// Time as shown on the page served after a password unlock.
pub static UNLOCKED_TIME_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("time", &[r#"class="n_file_infos">(.+?)</span>"#]));

pub static UNLOCKED_DESC_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("description", &[r#"class="n_box_des">(.*?)</div>"#]));

pub static FRAME_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("frame", &[r#"<iframe.*?src="(.+?)""#]));

pub static SIGN_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("sign", &[r"'sign':(.+?),"]));

pub static PASSWORD_SIGN_PATTERNS: Lazy<PatternChain> = Lazy::new(|| {
    PatternChain::new(
        "sign",
        &[r"var skdklds = '(.*?)';", r"var\s+skdklds\s*=\s*'([^']*)';"],
    )
});

pub static AJAX_PATH_PATTERNS: Lazy<PatternChain> = Lazy::new(|| {
    PatternChain::new("ajax_path", &[r"url\s*:\s*'(/ajaxm\.php\?file=\d+)'"])
});

pub static AJAXDATA_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("ajaxdata", &[r"var ajaxdata\s*=\s*'(.+?)';"]));

pub static WEBSIGN_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("websign", &[r"var a?websigna?\s*=\s*'(.+?)';"]));

pub static WEBSIGNKEY_PATTERNS: Lazy<PatternChain> =
    Lazy::new(|| PatternChain::new("websignkey", &[r"var c?websignkeyc?\s*=\s*'(.+?)';"]));

/// Captured `sign` values shorter than this are variable names, not tokens.
const SIGN_LITERAL_MIN_LEN: usize = 20;

/// Default ajax endpoint when the page does not name one.
pub const DEFAULT_AJAX_PATH: &str = "/ajaxm.php";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no pattern matched field '{0}'")]
    MissingField(&'static str),
}

/// Extra tokens required when the share link carries `webpage=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebpageParams {
    pub ajaxdata: String,
    pub websign: String,
    pub websignkey: String,
}

/// Everything needed to post the signed download request of an open share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub sign: String,
    pub webpage: Option<WebpageParams>,
}

impl SignedRequest {
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![("action".to_string(), "downprocess".to_string())];
        if let Some(webpage) = &self.webpage {
            fields.push(("signs".to_string(), webpage.ajaxdata.clone()));
        }
        fields.push(("sign".to_string(), self.sign.clone()));
        fields.push(("ves".to_string(), "1".to_string()));
        if let Some(webpage) = &self.webpage {
            fields.push(("websign".to_string(), webpage.websign.clone()));
            fields.push(("websignkey".to_string(), webpage.websignkey.clone()));
        }
        fields
    }
}

/// Payload of the signed download request of a password-protected share.
pub fn password_form_fields(sign: &str, password: &str) -> Vec<(String, String)> {
    vec![
        ("action".to_string(), "downprocess".to_string()),
        ("sign".to_string(), sign.to_string()),
        ("p".to_string(), password.to_string()),
    ]
}

/// Name, time, size, and description from an open share's landing page.
/// Unmatched fields keep their defaults.
pub fn extract_metadata(cleaned: &str) -> ExtractedMetadata {
    let mut metadata = ExtractedMetadata::default();
    if let Some(name) = NAME_PATTERNS.first_match(cleaned) {
        metadata.set_name(normalize_name(name));
    }
    if let Some(time) = TIME_PATTERNS.first_match(cleaned) {
        metadata.upload_time = normalize_time(time);
    }
    if let Some(size) = SIZE_PATTERNS.first_match(cleaned) {
        metadata.size = normalize_size(size);
    }
    if let Some(desc) = DESC_PATTERNS.first_match(cleaned) {
        metadata.description = desc.to_string();
    }
    metadata
}

/// Time, size, and description from the page served after unlocking a
/// password-protected share. The name comes from the signed-link response.
pub fn extract_unlocked_metadata(cleaned: &str) -> ExtractedMetadata {
    let mut metadata = ExtractedMetadata::default();
    if let Some(size) = SIZE_PATTERNS.first_match(cleaned) {
        metadata.size = normalize_size(size);
    }
    if let Some(time) = UNLOCKED_TIME_PATTERNS.first_match(cleaned) {
        metadata.upload_time = normalize_time(time);
    }
    if let Some(desc) = UNLOCKED_DESC_PATTERNS.first_match(cleaned) {
        metadata.description = desc.to_string();
    }
    metadata
}

/// Path of the embedded download frame of an open share.
pub fn extract_frame_path(cleaned: &str) -> Option<String> {
    FRAME_PATTERNS.first_match(cleaned).map(str::to_string)
}

/// Ajax endpoint named by the page, if any.
pub fn extract_ajax_path(cleaned: &str) -> Option<String> {
    AJAX_PATH_PATTERNS.first_match(cleaned).map(str::to_string)
}

pub fn extract_password_sign(cleaned: &str) -> Option<String> {
    PASSWORD_SIGN_PATTERNS.first_match(cleaned).map(str::to_string)
}

/// Resolve the `sign` token of the download frame.
///
/// The ajax payload holds either the literal token or the name of a page
/// variable that holds it; short captures are looked up as variables.
pub fn extract_sign(cleaned: &str) -> Option<String> {
    let captured = SIGN_PATTERNS.first_match(cleaned)?.trim();
    let unquoted = captured.trim_matches(|c| c == '\'' || c == '"');

    if captured.len() >= SIGN_LITERAL_MIN_LEN {
        return Some(unquoted.to_string());
    }

    resolve_variable(cleaned, captured).or_else(|| {
        (unquoted.len() != captured.len() && !unquoted.is_empty()).then(|| unquoted.to_string())
    })
}

fn resolve_variable(cleaned: &str, name: &str) -> Option<String> {
    let pattern = format!(r"var {}\s*=\s*'(.+?)';", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    re.captures(cleaned)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Tokens for the extra-parameter mode. Any missing token fails the branch.
pub fn extract_webpage_params(cleaned: &str) -> Result<WebpageParams, ExtractionError> {
    let take = |chain: &PatternChain| {
        chain
            .first_match(cleaned)
            .map(str::to_string)
            .ok_or(ExtractionError::MissingField(chain.field()))
    };

    Ok(WebpageParams {
        ajaxdata: take(&AJAXDATA_PATTERNS)?,
        websign: take(&WEBSIGN_PATTERNS)?,
        websignkey: take(&WEBSIGNKEY_PATTERNS)?,
    })
}

/// Sign token plus, when `want_webpage_params` is set, the three extra
/// tokens of the `webpage=` mode.
pub fn extract_signed_request(
    cleaned: &str,
    want_webpage_params: bool,
) -> Result<SignedRequest, ExtractionError> {
    let sign = extract_sign(cleaned).ok_or(ExtractionError::MissingField("sign"))?;
    let webpage = if want_webpage_params {
        Some(extract_webpage_params(cleaned)?)
    } else {
        None
    };
    Ok(SignedRequest { sign, webpage })
}
