//! Records returned by the account endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The three cookies of a logged-in web session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanzouCookie {
    #[serde(rename = "PHPSESSID")]
    pub phpsessid: String,
    pub ylogin: String,
    pub phpdisk_info: String,
}

impl LanzouCookie {
    pub fn new(
        phpsessid: impl Into<String>,
        ylogin: impl Into<String>,
        phpdisk_info: impl Into<String>,
    ) -> Self {
        Self {
            phpsessid: phpsessid.into(),
            ylogin: ylogin.into(),
            phpdisk_info: phpdisk_info.into(),
        }
    }

    /// All three cookies carry a value.
    pub fn is_complete(&self) -> bool {
        !self.phpsessid.is_empty() && !self.ylogin.is_empty() && !self.phpdisk_info.is_empty()
    }

    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("PHPSESSID", self.phpsessid.as_str()),
            ("ylogin", self.ylogin.as_str()),
            ("phpdisk_info", self.phpdisk_info.as_str()),
        ]
    }
}

/// Whether an id names a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    pub(crate) fn id_field(self) -> &'static str {
        match self {
            ItemKind::File => "file_id",
            ItemKind::Folder => "folder_id",
        }
    }
}

/// Share link details of a file or folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShareInfo {
    pub name: String,
    pub url: String,
    pub desc: String,
    /// Empty when the share has no password.
    pub pwd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub has_pwd: bool,
    pub desc: String,
}

/// Raw entry of the folder listing.
#[derive(Debug, Deserialize)]
pub(crate) struct FolderEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub fol_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub onof: bool,
    #[serde(default)]
    pub folder_des: String,
}

impl From<FolderEntry> for Folder {
    fn from(entry: FolderEntry) -> Self {
        Self {
            id: entry.fol_id,
            name: entry.name,
            has_pwd: entry.onof,
            desc: entry.folder_des.trim_matches(|c| c == '[' || c == ']').to_string(),
        }
    }
}

/// A file stored in the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    /// Upload date, `YYYY-MM-DD` when the listing used a known format.
    pub time: String,
    pub size: String,
    pub file_type: String,
    pub downloads: String,
    pub has_pwd: bool,
    pub has_desc: bool,
}

/// Raw entry of the file listing.
#[derive(Debug, Deserialize)]
pub(crate) struct FileEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    pub name_all: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub size: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub downs: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub onof: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_des: bool,
}

/// Raw entry of an upload reply.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadedEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub downs: String,
}

/// `"1"`/`1` style flags; anything else is false.
pub(crate) fn is_flag_set(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        Value::Bool(b) => *b,
        _ => false,
    }
}

/// Strings and numbers as a string; null as empty.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| value_to_string(&value))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| is_flag_set(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folder_accepts_numeric_ids_and_string_flags() {
        let entry: FolderEntry = serde_json::from_value(json!({
            "fol_id": 1234567,
            "name": "docs",
            "onof": "1",
            "folder_des": "[notes]"
        }))
        .unwrap();
        let folder = Folder::from(entry);
        assert_eq!(folder.id, "1234567");
        assert!(folder.has_pwd);
        assert_eq!(folder.desc, "notes");
    }

    #[test]
    fn cookie_completeness() {
        assert!(LanzouCookie::new("a", "1", "c").is_complete());
        assert!(!LanzouCookie::new("a", "", "c").is_complete());
    }

    #[test]
    fn flags() {
        assert!(is_flag_set(&json!(1)));
        assert!(is_flag_set(&json!("1")));
        assert!(!is_flag_set(&json!("0")));
        assert!(!is_flag_set(&Value::Null));
    }
}
