//! One-way sync of the local web app assets into the bucket.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Devices must always fetch the latest web app.
const CACHE_CONTROL: &str = "no-cache";

/// A file under the local asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Object key, relative path with `/` separators
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    /// Modification time, epoch seconds
    pub modified: Option<i64>,
}

/// What the bucket already holds for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteObject {
    pub size: i64,
    /// Last upload time, epoch seconds
    pub last_modified: Option<i64>,
}

/// Outcome of a sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: usize,
    pub unchanged: usize,
}

/// List every regular file under `dir`.
pub fn scan(dir: &Path) -> Result<Vec<LocalFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("{} is outside {}", entry.path().display(), dir.display()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| i64::try_from(d.as_secs()).ok());

        files.push(LocalFile {
            key,
            path: entry.path().to_path_buf(),
            size: metadata.len(),
            modified,
        });
    }

    Ok(files)
}

/// Files that are missing remotely, changed size, or were modified locally
/// after the remote copy was uploaded.
pub fn plan<'a>(
    local: &'a [LocalFile],
    remote: &HashMap<String, RemoteObject>,
) -> Vec<&'a LocalFile> {
    local
        .iter()
        .filter(|file| match remote.get(&file.key) {
            Some(object) => needs_upload(file, object),
            None => true,
        })
        .collect()
}

fn needs_upload(file: &LocalFile, object: &RemoteObject) -> bool {
    if u64::try_from(object.size).map_or(true, |size| size != file.size) {
        return true;
    }
    match (file.modified, object.last_modified) {
        (Some(local), Some(remote)) => local > remote,
        _ => false,
    }
}

/// Content type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("js" | "mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("ts") => "text/plain",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Publishes local assets to one bucket.
pub struct Publisher {
    client: S3Client,
    bucket: String,
}

impl Publisher {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Objects already in the bucket, by key.
    async fn remote_objects(&self) -> Result<HashMap<String, RemoteObject>> {
        let mut objects = HashMap::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.with_context(|| format!("Failed to list bucket {}", self.bucket))?;
            for object in page.contents() {
                if let (Some(key), Some(size)) = (object.key(), object.size()) {
                    let last_modified = object.last_modified().map(|t| t.secs());
                    objects.insert(
                        key.to_string(),
                        RemoteObject {
                            size,
                            last_modified,
                        },
                    );
                }
            }
        }

        Ok(objects)
    }

    async fn upload(&self, file: &LocalFile) -> Result<()> {
        let body = ByteStream::from_path(&file.path)
            .await
            .with_context(|| format!("Failed to read {}", file.path.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&file.key)
            .body(body)
            .acl(ObjectCannedAcl::PublicRead)
            .cache_control(CACHE_CONTROL)
            .content_type(content_type(&file.path))
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to s3://{}", file.key, self.bucket))?;

        Ok(())
    }

    /// Upload new and changed files from `source`. With `dryrun` nothing is written.
    pub async fn sync(&self, source: &Path, dryrun: bool) -> Result<SyncReport> {
        let local = scan(source)?;
        let remote = self.remote_objects().await?;
        let changed = plan(&local, &remote);
        debug!(local = local.len(), remote = remote.len(), "Computed sync plan");

        for file in &changed {
            let target = format!("s3://{}/{}", self.bucket, file.key);
            if dryrun {
                info!("(dryrun) upload: {} to {}", file.path.display(), target);
            } else {
                self.upload(file).await?;
                info!("upload: {} to {}", file.path.display(), target);
            }
        }

        Ok(SyncReport {
            uploaded: if dryrun { 0 } else { changed.len() },
            unchanged: local.len() - changed.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(key: &str, size: u64) -> LocalFile {
        LocalFile {
            key: key.to_string(),
            path: PathBuf::from(key),
            size,
            modified: Some(100),
        }
    }

    fn stored(size: i64, last_modified: i64) -> RemoteObject {
        RemoteObject {
            size,
            last_modified: Some(last_modified),
        }
    }

    #[test]
    fn test_scan_uses_forward_slash_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js").join("index.js"), "let a;").unwrap();

        let files = scan(dir.path()).unwrap();
        let keys: Vec<&str> = files.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["index.html", "js/index.js"]);
        assert_eq!(files[0].size, 13);
        assert!(files[0].modified.is_some());
    }

    #[test]
    fn test_plan_skips_unchanged() {
        let local = vec![file("index.html", 10), file("index.js", 20), file("new.css", 5)];
        let remote = HashMap::from([
            ("index.html".to_string(), stored(10, 200)),
            ("index.js".to_string(), stored(21, 200)),
        ]);

        let keys: Vec<&str> = plan(&local, &remote).iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["index.js", "new.css"]);
    }

    #[test]
    fn test_plan_uploads_same_size_edit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>new</p>").unwrap();
        let local = scan(dir.path()).unwrap();
        let written = local[0].modified.unwrap();

        let stale = HashMap::from([("index.html".to_string(), stored(10, written - 60))]);
        assert_eq!(plan(&local, &stale).len(), 1);

        let current = HashMap::from([("index.html".to_string(), stored(10, written + 60))]);
        assert!(plan(&local, &current).is_empty());
    }

    #[test]
    fn test_plan_without_timestamps_compares_size() {
        let mut local = vec![file("index.html", 10)];
        local[0].modified = None;
        let remote = HashMap::from([("index.html".to_string(), stored(10, 500))]);
        assert!(plan(&local, &remote).is_empty());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.html")), "text/html");
        assert_eq!(content_type(Path::new("app/INDEX.JS")), "text/javascript");
        assert_eq!(content_type(Path::new("alexaSDK.d.ts")), "text/plain");
        assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
    }
}
