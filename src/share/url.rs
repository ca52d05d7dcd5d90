//! Share URL shape checks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Any URL on a `lanzouX.com` host (custom subdomain optional) with a path.
static BASE_SHARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[a-zA-Z0-9-]*?\.?lanzou[a-z].com/.+$").unwrap());

/// Ordinary user share: `/i` followed by at least five alphanumerics.
static STANDARD_SHARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9-]*?\.?lanzou[a-z].com/i[a-zA-Z0-9]{5,}(\?webpage=[a-zA-Z0-9]+?)?/?$")
        .unwrap()
});

/// Markers found on every file page, whatever the URL looks like.
static FILE_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="fileinfo"|id="file"|文件描述"#).unwrap());

/// Outcome of the URL shape check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareUrlKind {
    /// Not a share URL at all.
    Rejected,
    /// Standard file share.
    Standard,
    /// Custom (VIP) path; only the fetched page can tell whether it is a file.
    NeedsProbe,
}

pub fn classify_share_url(url: &str) -> ShareUrlKind {
    if !BASE_SHARE_RE.is_match(url) {
        ShareUrlKind::Rejected
    } else if STANDARD_SHARE_RE.is_match(url) {
        ShareUrlKind::Standard
    } else {
        ShareUrlKind::NeedsProbe
    }
}

/// Whether a comment-stripped page is a file share page.
pub fn looks_like_file_page(cleaned_html: &str) -> bool {
    FILE_PAGE_RE.is_match(cleaned_html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_share_urls() {
        for url in [
            "https://pan.lanzouo.com/",
            "https://pan.lanzouo.com",
            "https://example.com/iAbcdef1",
            "ftp://pan.lanzouo.com/iAbcdef1",
            "not a url",
        ] {
            assert_eq!(classify_share_url(url), ShareUrlKind::Rejected, "{url}");
        }
    }

    #[test]
    fn accepts_standard_shares() {
        for url in [
            "https://pan.lanzouo.com/iAbcde1",
            "https://wwa.lanzoui.com/i7tit9c/",
            "http://lanzoux.com/iXyZ12345",
            "https://pan.lanzouw.com/iAbcde1?webpage=Q1w2e3",
        ] {
            assert_eq!(classify_share_url(url), ShareUrlKind::Standard, "{url}");
        }
    }

    #[test]
    fn custom_paths_need_probe() {
        assert_eq!(
            classify_share_url("https://vip.lanzouo.com/my-custom-share"),
            ShareUrlKind::NeedsProbe
        );
        assert_eq!(
            classify_share_url("https://pan.lanzouo.com/b0f1234"),
            ShareUrlKind::NeedsProbe
        );
    }

    #[test]
    fn file_page_markers() {
        assert!(looks_like_file_page(r#"<div class="fileinfo">x</div>"#));
        assert!(looks_like_file_page("<td>文件描述：</td>"));
        assert!(!looks_like_file_page("<div class=\"mydisk\">folder</div>"));
    }
}
