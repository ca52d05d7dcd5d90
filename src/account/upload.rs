//! File upload and name rules.

use std::path::Path;

use bytes::Bytes;
use chrono::Local;
use serde_json::Value;

use crate::share::core::{MultipartField, RequestBody};

use super::types::UploadedEntry;
use super::{AccountError, AccountResult, ItemKind, LanzouAccount, RemoteFile};

/// Suffixes the service accepts for upload.
pub const ALLOWED_SUFFIXES: &[&str] = &[
    "ppt", "xapk", "ke", "azw", "cpk", "gho", "dwg", "db", "docx", "deb", "e", "ttf", "xls", "bat",
    "crx", "rpm", "txf", "pdf", "apk", "ipa", "txt", "mobi", "osk", "dmg", "rp", "osz", "jar",
    "ttc", "z", "w3x", "xlsx", "cetrainer", "ct", "rar", "mp3", "pptx", "mobileconfig", "epub",
    "imazingapp", "doc", "iso", "img", "appimage", "7z", "rplib", "lolgezi", "exe", "azw3", "zip",
    "conf", "tar", "dll", "flac", "xpa", "lua", "cad", "hwt", "accdb", "ce", "xmind", "enc", "bds",
    "bdi", "ssf", "it", "gz",
];

const FORBIDDEN_CHARS: &[char] = &[
    '$', '%', '^', '!', '*', '<', '>', ')', '(', '+', '=', '`', '\'', '"', '/', ':', ';', ',', '?',
];

/// Normalise exotic spaces and drop characters the service refuses in names.
pub fn sanitize_name(name: &str) -> String {
    name.replace(['\u{a0}', '\u{3000}'], " ")
        .replace("  ", " ")
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect()
}

/// Whether the file name carries an uploadable suffix.
pub fn is_name_allowed(file_name: &str) -> bool {
    let suffix = file_name.rsplit('.').next().unwrap_or_default().to_lowercase();
    ALLOWED_SUFFIXES.contains(&suffix.as_str())
}

impl LanzouAccount<'_> {
    /// Upload a local file into `folder_id` (`-1` is the root).
    ///
    /// A remote file with the same name is deleted first. Returns the
    /// records the service created.
    pub async fn upload_file(&self, path: &Path, folder_id: &str) -> AccountResult<Vec<RemoteFile>> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(AccountError::NotAFile(path.to_path_buf()));
        }

        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_name_allowed(&base_name) {
            return Err(AccountError::NameNotAllowed(base_name));
        }
        if meta.len() > self.settings.max_upload_size {
            return Err(AccountError::FileTooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: self.settings.max_upload_size,
            });
        }

        let file_name = sanitize_name(&base_name);
        for existing in self.files(folder_id).await? {
            if existing.name == file_name {
                log::info!("replacing remote file {file_name} ({})", existing.id);
                self.delete(&existing.id, ItemKind::File).await?;
            }
        }

        let data = Bytes::from(tokio::fs::read(path).await?);
        log::debug!("uploading {} ({} bytes)", path.display(), data.len());

        let mime = mime_guess::from_path(path).first_or_octet_stream().to_string();
        let modified = Local::now()
            .format("%a %b %d %Y %H:%M:%S GMT%z (%Z)")
            .to_string();

        let text = |name: &str, value: &str| MultipartField::Text {
            name: name.to_string(),
            value: value.to_string(),
        };
        let body = RequestBody::Multipart(vec![
            text("task", "1"),
            text("vie", "2"),
            text("ve", "2"),
            text("id", "WU_FILE_0"),
            text("name", &file_name),
            text("type", &mime),
            text("lastModifiedDate", &modified),
            text("folder_id_bb_n", folder_id),
            MultipartField::File {
                name: "upload_file".to_string(),
                file_name: file_name.clone(),
                mime: "application/octet-stream".to_string(),
                data,
            },
        ]);

        let url = self.settings.endpoint("html5up.php")?;
        let options = self.options().with_timeout(self.settings.upload_timeout);
        let reply: Value = self.http.post(&url, body, options).await?.json()?;
        super::ensure_ok(&reply)?;

        let entries: Vec<UploadedEntry> = match &reply["text"] {
            Value::Array(items) => serde_json::from_value(Value::Array(items.clone()))?,
            _ => Vec::new(),
        };
        log::info!("uploaded {file_name}");

        Ok(entries
            .into_iter()
            .map(|entry| RemoteFile {
                id: entry.id,
                name: entry.name,
                time: entry.time,
                size: entry.size,
                file_type: entry.icon,
                downloads: entry.downs,
                has_pwd: false,
                has_desc: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::Method;

    use super::super::fixtures::{DOUPLOAD, Harness};
    use super::*;

    #[test]
    fn sanitize_strips_forbidden_characters() {
        assert_eq!(sanitize_name("a\u{3000}b\u{a0}c"), "a b c");
        assert_eq!(sanitize_name("what?(final)*.zip"), "whatfinal.zip");
        assert_eq!(sanitize_name("two  spaces.txt"), "two spaces.txt");
    }

    #[test]
    fn suffix_whitelist() {
        assert!(is_name_allowed("setup.EXE"));
        assert!(is_name_allowed("archive.tar.gz"));
        assert!(!is_name_allowed("movie.mkv"));
        assert!(!is_name_allowed("README"));
    }

    fn temp_file(suffix: &str, content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[tokio::test]
    async fn rejects_disallowed_suffix_without_network() {
        let harness = Harness::new();
        let file = temp_file(".mkv", b"data");
        let err = harness
            .account()
            .upload_file(file.path(), "-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NameNotAllowed(_)));
        assert!(harness.stub.requests().is_empty());
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let harness = Harness::new();
        let file = temp_file(".zip", &[0u8; 2048]);
        let err = harness
            .account()
            .upload_file(file.path(), "-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::FileTooLarge { size: 2048, limit: 1024, .. }));
    }

    #[tokio::test]
    async fn uploads_after_replacing_same_name_file() {
        let harness = Harness::new();
        let file = temp_file(".txt", b"hello");
        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();

        let listing = format!(
            r#"{{"zt":1,"info":1,"text":[{{"id":"77","name_all":"{name}","time":"2023-01-01","size":"5 B","downs":"0","onof":"0","is_des":"0"}}]}}"#
        );
        harness.stub.ok(Method::POST, DOUPLOAD, &listing);
        harness
            .stub
            .ok(Method::POST, DOUPLOAD, r#"{"zt":1,"info":0,"text":[]}"#);
        harness.stub.ok(Method::POST, DOUPLOAD, r#"{"zt":1,"info":"deleted"}"#);
        let uploaded = format!(
            r#"{{"zt":1,"info":"ok","text":[{{"id":"88","name":"{name}","time":"0 秒前","size":"5 B","icon":"txt","downs":"0"}}]}}"#
        );
        harness
            .stub
            .ok(Method::POST, "https://pc.woozooo.com/html5up.php", &uploaded);

        let files = harness
            .account()
            .upload_file(file.path(), "-1")
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "88");
        assert_eq!(files[0].file_type, "txt");

        let requests = harness.stub.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2].body.form_value("task"), Some("6"));
        assert_eq!(requests[2].body.form_value("file_id"), Some("77"));

        let upload = &requests[3];
        assert_eq!(upload.timeout, harness.settings.upload_timeout);
        match &upload.body {
            RequestBody::Multipart(fields) => {
                assert!(fields.iter().any(|f| matches!(
                    f,
                    MultipartField::File { data, .. } if data.as_ref() == b"hello"
                )));
                assert!(fields.iter().any(|f| matches!(
                    f,
                    MultipartField::Text { name, value } if name == "folder_id_bb_n" && value == "-1"
                )));
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }
}
