//! Filesystem-rooted implementation of [`BackingStore`].
//!
//! Layout: `<root>/<path>` mirrors the logical BS path directly. Custom
//! metadata and the durability level are stored as a single JSON-encoded
//! extended attribute per file so no sidecar files are needed.

use super::{BackingStore, BodyStream, BsError, Headers, ListEvent, PathInfo, PutOptions};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

const XATTR_NAME: &str = "user.gateway.meta";
const ENOSPC: i32 = 28;

pub struct FilesystemBackingStore {
    root: PathBuf,
    user: String,
}

impl FilesystemBackingStore {
    pub fn new(root: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            user: user.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

fn io_to_bs_error(e: std::io::Error) -> BsError {
    match e.kind() {
        std::io::ErrorKind::NotFound => BsError::NotFound,
        std::io::ErrorKind::PermissionDenied => BsError::Forbidden,
        _ if e.raw_os_error() == Some(ENOSPC) => {
            BsError::Internal("no space left on device".to_string())
        }
        _ => BsError::Io(e),
    }
}

async fn read_metadata_xattr(path: &Path) -> Headers {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || match xattr::get(&path, XATTR_NAME) {
        Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_default(),
        _ => Headers::default(),
    })
    .await
    .unwrap_or_default()
}

async fn write_metadata_xattr(path: &Path, headers: &Headers) -> Result<(), BsError> {
    let path = path.to_path_buf();
    let json = serde_json::to_vec(headers)
        .map_err(|e| BsError::Internal(format!("metadata encode failed: {e}")))?;
    tokio::task::spawn_blocking(move || xattr::set(&path, XATTR_NAME, &json))
        .await
        .map_err(|e| BsError::Internal(format!("spawn_blocking join failed: {e}")))?
        .map_err(io_to_bs_error)
}

fn to_datetime(t: std::time::SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

async fn stat(path: &Path) -> Result<Option<PathInfo>, BsError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_to_bs_error(e)),
    };

    let is_directory = meta.is_dir();
    let mut headers = if is_directory {
        Headers::default()
    } else {
        read_metadata_xattr(path).await
    };
    if is_directory {
        headers.insert(
            "content-type".to_string(),
            crate::metadata_codec::DIRECTORY_CONTENT_TYPE.to_string(),
        );
    }

    Ok(Some(PathInfo {
        headers,
        size: meta.len(),
        last_modified: to_datetime(meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH)),
        is_directory,
    }))
}

#[async_trait]
impl BackingStore for FilesystemBackingStore {
    fn user(&self) -> &str {
        &self.user
    }

    async fn info(&self, path: &str) -> Result<Option<PathInfo>, BsError> {
        stat(&self.resolve(path)).await
    }

    async fn mkdir(&self, path: &str) -> Result<(), BsError> {
        let target = self.resolve(path);
        match tokio::fs::create_dir(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(io_to_bs_error(e)),
        }
    }

    async fn mkdirp(&self, path: &str) -> Result<(), BsError> {
        tokio::fs::create_dir_all(self.resolve(path))
            .await
            .map_err(io_to_bs_error)
    }

    async fn put(&self, path: &str, mut body: BodyStream, opts: PutOptions) -> Result<Headers, BsError> {
        let target = self.resolve(path);
        let parent = target
            .parent()
            .ok_or_else(|| BsError::Internal("path has no parent".to_string()))?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(io_to_bs_error)?;

        let tmp = tokio::task::spawn_blocking({
            let parent = parent.clone();
            move || NamedTempFile::new_in(&parent)
        })
        .await
        .map_err(|e| BsError::Internal(format!("spawn_blocking join failed: {e}")))?
        .map_err(io_to_bs_error)?;

        let mut file = tokio::fs::File::from_std(tmp.reopen().map_err(io_to_bs_error)?);
        let mut hasher = Md5::new();
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(BsError::Io)?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(io_to_bs_error)?;
        }
        file.sync_all().await.map_err(io_to_bs_error)?;
        drop(file);

        let target_for_persist = target.clone();
        tokio::task::spawn_blocking(move || tmp.persist(&target_for_persist))
            .await
            .map_err(|e| BsError::Internal(format!("spawn_blocking join failed: {e}")))?
            .map_err(|e| io_to_bs_error(e.error))?;

        // Server-side MD5: the backing store computes the digest as it
        // writes the stream, the same way it reports durability — the
        // gateway never has to buffer the body to checksum it itself.
        let digest = hasher.finalize();
        let content_md5 = base64::engine::general_purpose::STANDARD.encode(digest);

        let mut headers = opts.headers;
        headers.insert("content-md5".to_string(), content_md5.clone());
        write_metadata_xattr(&target, &headers).await?;

        let mut result = headers;
        result.insert("content-length".to_string(), written.to_string());
        Ok(result)
    }

    async fn get(&self, path: &str) -> Result<(BodyStream, PathInfo), BsError> {
        let target = self.resolve(path);
        let info = stat(&target).await?.ok_or(BsError::NotFound)?;
        if info.is_directory {
            return Ok((stream::empty().boxed(), info));
        }
        let file = tokio::fs::File::open(&target).await.map_err(io_to_bs_error)?;
        let body = ReaderStream::new(file).boxed();
        Ok((body, info))
    }

    async fn unlink(&self, path: &str) -> Result<(), BsError> {
        tokio::fs::remove_file(self.resolve(path))
            .await
            .map_err(io_to_bs_error)
    }

    async fn ln(&self, src: &str, dst: &str) -> Result<(), BsError> {
        let src_path = self.resolve(src);
        let dst_path = self.resolve(dst);
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_to_bs_error)?;
        }
        let headers = read_metadata_xattr(&src_path).await;

        tokio::task::spawn_blocking(move || std::fs::hard_link(&src_path, &dst_path))
            .await
            .map_err(|e| BsError::Internal(format!("spawn_blocking join failed: {e}")))?
            .map_err(io_to_bs_error)?;

        write_metadata_xattr(&self.resolve(dst), &headers).await
    }

    fn ls(&self, path: &str) -> BoxStream<'static, ListEvent> {
        let target = self.resolve(path);
        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut read_dir = match tokio::fs::read_dir(&target).await {
                Ok(rd) => rd,
                Err(e) => {
                    let status_like_404 = e.kind() == std::io::ErrorKind::NotFound;
                    let _ = tx
                        .send(ListEvent::Error {
                            status_like_404,
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            loop {
                let next = match read_dir.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx
                            .send(ListEvent::Error {
                                status_like_404: false,
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                };

                let parent_path = target.to_string_lossy().to_string();
                let name = next.file_name().to_string_lossy().to_string();
                let info = match stat(&next.path()).await {
                    Ok(Some(info)) => info,
                    Ok(None) => continue,
                    Err(_) => continue,
                };

                let event = if info.is_directory {
                    ListEvent::Directory {
                        parent_path,
                        name,
                        info,
                    }
                } else {
                    ListEvent::Object {
                        parent_path,
                        name,
                        info,
                    }
                };

                if tx.send(event).await.is_err() {
                    // Receiver dropped (early termination); stop walking.
                    return;
                }
            }

            let _ = tx.send(ListEvent::End).await;
        });

        tokio_stream::wrappers::ReceiverStream::new(rx).boxed()
    }

    async fn rmdir(&self, path: &str) -> Result<(), BsError> {
        tokio::fs::remove_dir(self.resolve(path))
            .await
            .map_err(io_to_bs_error)
    }
}

/// Probes whether the filesystem at `root` supports the extended attributes
/// this backend relies on for metadata storage.
pub async fn validate_xattr_support(root: &Path) -> Result<(), BsError> {
    let probe_path = root.join(".gateway_xattr_probe");
    let probe = probe_path.clone();

    tokio::task::spawn_blocking(move || {
        std::fs::write(&probe, b"probe").map_err(io_to_bs_error)?;
        let result: Result<(), BsError> = (|| {
            xattr::set(&probe, XATTR_NAME, b"ok").map_err(io_to_bs_error)?;
            match xattr::get(&probe, XATTR_NAME).map_err(io_to_bs_error)? {
                Some(v) if v == b"ok" => Ok(()),
                _ => Err(BsError::Internal("xattr readback mismatch".to_string())),
            }
        })();
        let _ = std::fs::remove_file(&probe);
        result.map_err(|_| {
            BsError::Internal(
                "backing store root does not support extended attributes (xattr); use ext4, \
                 XFS, Btrfs, ZFS, or APFS"
                    .to_string(),
            )
        })
    })
    .await
    .map_err(|e| BsError::Internal(format!("spawn_blocking join failed: {e}")))?
}
