//! The backing-store client contract: `info`, `mkdir`/`mkdirp`, `put`, `get`,
//! `unlink`, `ln`, `ls`, and the store's reported `user`.
//!
//! This module only declares the contract. [`fs`] ships the one concrete,
//! filesystem-rooted implementation this repository needs to be runnable
//! end to end.

pub mod fs;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::collections::HashMap;
use thiserror::Error;

pub type BodyStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Headers reported by or supplied to a backing-store call, keyed by
/// lowercased header name.
pub type Headers = HashMap<String, String>;

/// An HTTP-shaped failure from the backing store. 404 is the only status
/// callers are required to distinguish; everything else collapses to
/// `InternalError` once converted into a gateway error.
#[derive(Debug, Error)]
pub enum BsError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("conflict")]
    Conflict,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal backing-store error: {0}")]
    Internal(String),
}

/// Metadata about a path as reported by `info`/`get`.
#[derive(Debug, Clone)]
pub struct PathInfo {
    pub headers: Headers,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub is_directory: bool,
}

/// A single entry yielded by [`BackingStore::ls`].
#[derive(Debug, Clone)]
pub enum ListEvent {
    Object {
        parent_path: String,
        name: String,
        info: PathInfo,
    },
    Directory {
        parent_path: String,
        name: String,
        info: PathInfo,
    },
    /// The walk completed normally; no more events will follow.
    End,
    /// The walk failed; `status_like_404` distinguishes a missing root
    /// (surfaced as `AllAccessDisabled` by the caller per spec) from any
    /// other backing-store failure (`InternalError`).
    Error { status_like_404: bool, message: String },
}

/// Options accompanying a `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub headers: Headers,
}

#[async_trait]
pub trait BackingStore: Send + Sync {
    /// The identity the store reports for ACL/owner display purposes.
    fn user(&self) -> &str;

    /// Looks up a path's metadata. `Ok(None)` means 404.
    async fn info(&self, path: &str) -> Result<Option<PathInfo>, BsError>;

    /// Creates exactly `path` as a directory. Idempotent if already a directory.
    async fn mkdir(&self, path: &str) -> Result<(), BsError>;

    /// Creates `path` and every missing ancestor directory below the given root.
    async fn mkdirp(&self, path: &str) -> Result<(), BsError>;

    /// Streams `body` into `path`, creating or replacing the object.
    async fn put(&self, path: &str, body: BodyStream, opts: PutOptions) -> Result<Headers, BsError>;

    /// Opens `path` for streaming read, returning its metadata alongside the body.
    async fn get(&self, path: &str) -> Result<(BodyStream, PathInfo), BsError>;

    /// Removes the object at `path`.
    async fn unlink(&self, path: &str) -> Result<(), BsError>;

    /// Creates a link from `dst` to the data at `src` (used by CopyObject).
    async fn ln(&self, src: &str, dst: &str) -> Result<(), BsError>;

    /// Walks `path`, yielding [`ListEvent`]s over an internally buffered
    /// channel. Dropping the returned stream before it is exhausted detaches
    /// the underlying walk (used by the listing max-keys cap and client
    /// disconnect).
    fn ls(&self, path: &str) -> BoxStream<'static, ListEvent>;

    /// Removes an empty directory.
    async fn rmdir(&self, path: &str) -> Result<(), BsError>;
}
