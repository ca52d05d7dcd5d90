//! Listing, sharing, and housekeeping of files and folders.

use serde_json::Value;
use url::Url;

use crate::share::core::types::file_type_of;
use crate::share::core::{RequestOptions, ResolutionResult, ShareRequest};
use crate::share::extractors::normalize::{normalize_name, normalize_size, normalize_time};

use super::types::{FileEntry, FolderEntry, value_to_string};
use super::{
    AccountError, AccountResult, Folder, ItemKind, LanzouAccount, RemoteFile, ShareInfo,
    sanitize_name,
};

/// Static token the listing tasks expect.
const LIST_VEI: &str = "VFBQUg1fUghQBA9fAFo=";

const LOGOUT_MARKER: &str = "退出系统成功";

/// Password length limits, in characters.
const FILE_PWD_LEN: (usize, usize) = (2, 6);
const FOLDER_PWD_LEN: (usize, usize) = (1, 12);

impl From<FileEntry> for RemoteFile {
    fn from(entry: FileEntry) -> Self {
        let name = normalize_name(&entry.name_all);
        let file_type = file_type_of(&name);
        Self {
            id: entry.id,
            time: normalize_time(&entry.time),
            size: normalize_size(&entry.size),
            file_type,
            downloads: entry.downs,
            has_pwd: entry.onof,
            has_desc: entry.is_des,
            name,
        }
    }
}

impl LanzouAccount<'_> {
    /// Share link, password, name, and description of a file or folder.
    pub async fn share_info(&self, id: &str, kind: ItemKind) -> AccountResult<ShareInfo> {
        let task = match kind {
            ItemKind::File => "22",
            ItemKind::Folder => "18",
        };
        let reply = self
            .post_checked([("task", task), (kind.id_field(), id)])
            .await?;
        let info = &reply["info"];

        let is_file_reply = info.get("f_id").is_some();
        if info["f_id"].as_str() == Some("i")
            || (!is_file_reply && value_to_string(&info["name"]).is_empty())
        {
            return Err(AccountError::InvalidId(id.to_string()));
        }

        // A random placeholder password is returned while the share is open.
        let pwd = if value_to_string(&info["onof"]) == "1" {
            value_to_string(&info["pwd"])
        } else {
            String::new()
        };

        if is_file_reply {
            let url = format!(
                "{}/{}",
                value_to_string(&info["is_newd"]),
                value_to_string(&info["f_id"])
            );
            let details = self
                .post_checked([("task", "12"), ("file_id", id)])
                .await?;
            Ok(ShareInfo {
                name: value_to_string(&details["text"]),
                url,
                desc: value_to_string(&details["info"]),
                pwd,
            })
        } else {
            Ok(ShareInfo {
                name: value_to_string(&info["name"]),
                url: value_to_string(&info["new_url"]),
                desc: value_to_string(&info["des"]),
                pwd,
            })
        }
    }

    /// Set or clear (empty `pwd`) the extraction password.
    ///
    /// Files take 2 to 6 characters, folders 1 to 12.
    pub async fn set_password(&self, id: &str, pwd: &str, kind: ItemKind) -> AccountResult<()> {
        if !pwd.is_empty() {
            let (min, max) = match kind {
                ItemKind::File => FILE_PWD_LEN,
                ItemKind::Folder => FOLDER_PWD_LEN,
            };
            let len = pwd.chars().count();
            if !(min..=max).contains(&len) {
                log::warn!("rejecting share password of {len} characters");
                return Err(AccountError::PasswordLength { min, max, len });
            }
        }

        let task = match kind {
            ItemKind::File => "23",
            ItemKind::Folder => "16",
        };
        let shows = if pwd.is_empty() { "0" } else { "1" };
        self.post_checked([
            ("task", task),
            (kind.id_field(), id),
            ("shows", shows),
            ("shownames", pwd),
        ])
        .await
        .map(drop)
    }

    /// Sub-folders of `parent_id` (`-1` is the root).
    pub async fn folders(&self, parent_id: &str) -> AccountResult<Vec<Folder>> {
        let mut url = Url::parse(&self.settings.doupload_url()?)
            .map_err(|err| AccountError::Rejected(err.to_string()))?;
        url.query_pairs_mut().append_pair("uid", &self.settings.uid);

        let reply = self
            .post_task(
                url.as_str(),
                [("task", "47"), ("folder_id", parent_id), ("vei", LIST_VEI)],
            )
            .await?;

        let entries: Vec<FolderEntry> = match &reply["text"] {
            Value::Array(items) => serde_json::from_value(Value::Array(items.clone()))?,
            _ => {
                log::warn!("folder listing reply without entries: {reply}");
                Vec::new()
            }
        };
        Ok(entries.into_iter().map(Folder::from).collect())
    }

    /// All files of `folder_id`, fetched page by page until the listing runs
    /// dry.
    pub async fn files(&self, folder_id: &str) -> AccountResult<Vec<RemoteFile>> {
        let url = self.settings.doupload_url()?;
        let mut files = Vec::new();

        for page in 1u32.. {
            let page_str = page.to_string();
            let reply = self
                .post_task(
                    &url,
                    [
                        ("task", "5"),
                        ("folder_id", folder_id),
                        ("pg", page_str.as_str()),
                        ("vei", LIST_VEI),
                    ],
                )
                .await?;

            if value_to_string(&reply["info"]) == "0" {
                break;
            }
            let entries: Vec<FileEntry> = match &reply["text"] {
                Value::Array(items) => serde_json::from_value(Value::Array(items.clone()))?,
                _ => break,
            };
            if entries.is_empty() {
                break;
            }
            files.extend(entries.into_iter().map(RemoteFile::from));
        }

        Ok(files)
    }

    /// Rename a folder and replace its description.
    pub async fn rename_folder(&self, folder_id: &str, name: &str, desc: &str) -> AccountResult<()> {
        let name = sanitize_name(name);
        self.post_checked([
            ("task", "4"),
            ("folder_id", folder_id),
            ("folder_name", name.as_str()),
            ("folder_description", desc),
        ])
        .await
        .map(drop)
    }

    /// Set a description. A file description cannot be cleared once set;
    /// a folder description can.
    pub async fn set_description(&self, id: &str, desc: &str, kind: ItemKind) -> AccountResult<()> {
        match kind {
            ItemKind::File => self
                .post_checked([("task", "11"), ("file_id", id), ("desc", desc)])
                .await
                .map(drop),
            ItemKind::Folder => {
                let info = self.share_info(id, ItemKind::Folder).await?;
                self.rename_folder(id, &info.name, desc).await
            }
        }
    }

    /// Move a file, or an empty folder, to the recycle bin.
    pub async fn delete(&self, id: &str, kind: ItemKind) -> AccountResult<()> {
        let task = match kind {
            ItemKind::File => "6",
            ItemKind::Folder => "3",
        };
        self.post_checked([("task", task), (kind.id_field(), id)])
            .await
            .map(drop)
    }

    /// End the web session and drop the session cookies.
    pub async fn logout(&self) -> AccountResult<()> {
        let mut url = Url::parse(&self.settings.endpoint("account.php")?)
            .map_err(|err| AccountError::Rejected(err.to_string()))?;
        url.query_pairs_mut().append_pair("action", "logout");

        let response = self.http.get(url.as_str(), RequestOptions::new()).await?;

        for name in ["PHPSESSID", "ylogin", "phpdisk_info"] {
            self.http.remove_cookie(&self.settings.base_url, name);
        }

        if response.text().contains(LOGOUT_MARKER) {
            log::info!("logged out");
            Ok(())
        } else {
            Err(AccountError::Rejected("logout was not confirmed".into()))
        }
    }

    /// Resolve one of the account's files through its share link.
    pub async fn file_info_by_id(&self, file_id: &str) -> AccountResult<ResolutionResult> {
        let info = self.share_info(file_id, ItemKind::File).await?;
        Ok(self
            .resolver
            .resolve(&ShareRequest::new(info.url, info.pwd))
            .await)
    }

    pub async fn direct_url_by_id(&self, file_id: &str) -> AccountResult<Option<String>> {
        Ok(self.file_info_by_id(file_id).await?.into_direct_url())
    }
}
