//! Normalisation of scraped field values.

use chrono::{Duration, Local, NaiveDate};

/// Name reported when no name pattern matched.
pub const UNMATCHED_NAME: &str = "未匹配到文件名";

/// Size reported when no size pattern matched.
pub const DEFAULT_SIZE: &str = "0 M";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn today_string() -> String {
    today().format(DATE_FORMAT).to_string()
}

/// Normalise an upload time relative to the local date.
pub fn normalize_time(raw: &str) -> String {
    normalize_time_on(raw, today())
}

/// Normalise an upload time against an explicit `today`.
///
/// `N秒前`/`N分钟前`/`N小时前` map to `today`, `昨天` to one day earlier,
/// `前天` to two days earlier and `N天前` to N days earlier. Anything else,
/// including absolute dates, is returned unchanged.
pub fn normalize_time_on(raw: &str, today: NaiveDate) -> String {
    let days_ago = if raw.contains("秒前") || raw.contains("分钟前") || raw.contains("小时前") {
        Some(0)
    } else if raw.contains("昨天") {
        Some(1)
    } else if raw.contains("前天") {
        Some(2)
    } else if raw.contains("天前") {
        leading_number(raw)
    } else {
        None
    };

    match days_ago.and_then(|days| today.checked_sub_signed(Duration::days(days))) {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

fn leading_number(raw: &str) -> Option<i64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Drop thousands separators: `"1,234.5 M"` becomes `"1234.5 M"`.
pub fn normalize_size(raw: &str) -> String {
    raw.replace(',', "")
}

/// Make a scraped file name safe for local storage (`*` is not allowed on
/// most file systems) and decode HTML entities.
pub fn normalize_name(raw: &str) -> String {
    html_escape::decode_html_entities(raw).replace('*', "_")
}
