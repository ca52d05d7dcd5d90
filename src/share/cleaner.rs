//! Comment stripping for fetched markup.
//!
//! The share pages routinely keep superseded markup and script lines behind
//! `<!-- -->` and `//` comments. Those stale copies would satisfy the
//! extraction patterns, so every page is stripped before matching.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// HTML block comments, and `//` comments preceded by whitespace.
static BLOCK_AND_SPACED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--.+?-->|\s+//\s*.+").unwrap());

/// `//` comments trailing a statement that ends in `,` or `;`.
static TRAILING_SCRIPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.+?[,;])\s*//.+").unwrap());

/// Remove HTML and script comments.
///
/// The two passes repeat until the text stops changing, so a comment
/// revealed by removing another one is removed too and
/// `strip_comments(strip_comments(x)) == strip_comments(x)`.
pub fn strip_comments(html: &str) -> String {
    let mut current = html.to_string();
    loop {
        let next = strip_once(&current).into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(html: &str) -> Cow<'_, str> {
    match BLOCK_AND_SPACED_RE.replace_all(html, "") {
        Cow::Borrowed(untouched) => TRAILING_SCRIPT_RE.replace_all(untouched, "${1}"),
        Cow::Owned(stripped) => {
            Cow::Owned(TRAILING_SCRIPT_RE.replace_all(&stripped, "${1}").into_owned())
        }
    }
}
