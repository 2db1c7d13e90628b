//! Bucket-level S3 handlers: CREATE, DELETE, HEAD, LIST.
//!
//! A bucket is a directory immediately below the configured root; existence
//! of the directory *is* existence of the bucket, there is no separate
//! bucket record.

use super::{xml_response, AppState};
use crate::api::errors::S3Error;
use crate::api::extractors::ValidatedBucket;
use crate::api::xml::{self, BucketEntry};
use crate::backing_store::{BsError, ListEvent};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use std::sync::Arc;
use tracing::instrument;

/// LIST buckets handler
/// GET /
///
/// Consumes the whole root listing before replying, so a BS-internal
/// paginated walk of thousands of buckets is transparent to the client.
#[instrument(skip(state))]
pub async fn list_buckets(State(state): State<Arc<AppState>>) -> Result<Response, S3Error> {
    let mut stream = state.store.ls("/");
    let mut buckets = Vec::new();

    loop {
        match stream.next().await {
            Some(ListEvent::Directory { name, info, .. }) => {
                buckets.push(BucketEntry {
                    name,
                    creation_date: info.last_modified.to_rfc3339(),
                });
            }
            Some(ListEvent::Object { .. }) => {}
            Some(ListEvent::End) | None => break,
            Some(ListEvent::Error {
                status_like_404: true,
                ..
            }) => return Err(S3Error::AllAccessDisabled(String::new())),
            Some(ListEvent::Error { message, .. }) => return Err(S3Error::InternalError(message)),
        }
    }

    buckets.sort_by(|a, b| a.name.cmp(&b.name));
    let xml =
        xml::list_all_my_buckets_result(state.store.user(), &buckets, &state.config.s3_version);
    Ok(xml_response(xml, state.config.pretty_print))
}

/// CREATE bucket handler
/// PUT /{bucket}
///
/// Idempotent: creating an already-existing bucket succeeds.
#[instrument(skip(state))]
pub async fn create_bucket(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
) -> Result<Response, S3Error> {
    match state.store.mkdir(&bucket).await {
        Ok(()) => Ok((StatusCode::OK, [("Location", format!("/{bucket}"))]).into_response()),
        Err(BsError::Conflict) => Err(S3Error::BucketAlreadyExists(bucket)),
        Err(BsError::Forbidden) => Err(S3Error::AllAccessDisabled(bucket)),
        Err(e) => Err(S3Error::InternalError(e.to_string())),
    }
}

/// DELETE bucket handler
/// DELETE /{bucket}
///
/// Rejects with `BucketNotEmpty` if a bounded listing probe turns up any
/// child at all.
#[instrument(skip(state))]
pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
) -> Result<Response, S3Error> {
    let mut stream = state.store.ls(&bucket);
    let has_child = loop {
        match stream.next().await {
            Some(ListEvent::Object { .. }) | Some(ListEvent::Directory { .. }) => break true,
            Some(ListEvent::End) | None => break false,
            Some(ListEvent::Error {
                status_like_404: true,
                ..
            }) => return Err(S3Error::NoSuchBucket(bucket)),
            Some(ListEvent::Error { message, .. }) => return Err(S3Error::InternalError(message)),
        }
    };
    drop(stream);

    if has_child {
        return Err(S3Error::BucketNotEmpty(bucket));
    }

    match state.store.rmdir(&bucket).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(BsError::NotFound) => Err(S3Error::NoSuchBucket(bucket)),
        Err(e) => Err(S3Error::InternalError(e.to_string())),
    }
}

/// HEAD bucket handler
/// HEAD /{bucket}
#[instrument(skip(state))]
pub async fn head_bucket(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
) -> Result<Response, S3Error> {
    match state.store.info(&bucket).await {
        Ok(Some(info)) if info.is_directory => {
            Ok((StatusCode::OK, [("x-amz-bucket-region", "us-east-1")]).into_response())
        }
        Ok(_) => Err(S3Error::NoSuchBucket(bucket)),
        Err(e) => Err(S3Error::InternalError(e.to_string())),
    }
}
