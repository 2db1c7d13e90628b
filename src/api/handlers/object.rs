//! Object-level S3 handlers: GET, HEAD, PUT (with copy detection), DELETE,
//! listing, and the fixed-response ACL/multipart-uploads stubs.
//!
//! PUT and GET are the streaming pipes: the request/response body never
//! touches an intermediate buffer between the HTTP framework and the
//! backing store.

use super::{apply_headers, headers_to_map, xml_response, AppState};
use crate::api::errors::S3Error;
use crate::api::extractors::{ValidatedBucket, ValidatedPath};
use crate::api::xml::{self, ListBucketResultArgs, ObjectEntry};
use crate::backing_store::{BsError, ListEvent, PutOptions};
use crate::metadata_codec::{self, BsHeaders};
use crate::path_codec::{self, PathError};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

const DEFAULT_MAX_KEYS: u64 = 1000;

/// Query parameters recognized on an object-level request.
#[derive(Debug, serde::Deserialize, Default)]
pub struct ObjectQuery {
    pub acl: Option<String>,
    pub uploads: Option<String>,
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "partNumber")]
    pub part_number: Option<u32>,
}

/// Query parameters for the bucket-level listing operation. Also carries
/// `uploads`, since `GET /{bucket}?uploads` (ListMultipartUploads) shares a
/// path with ListObjects and only the query string tells them apart.
#[derive(Debug, serde::Deserialize, Default)]
pub struct ListObjectsQuery {
    #[serde(default)]
    pub prefix: String,
    #[serde(rename = "max-keys")]
    pub max_keys: Option<u64>,
    #[serde(default)]
    pub marker: String,
    pub delimiter: Option<String>,
    pub uploads: Option<String>,
}

/// Relative BS path for `bucket/key`, with `key` possibly empty (meaning the
/// bucket directory itself).
fn bs_path(bucket: &str, key: &str) -> String {
    path_codec::join_object("", bucket, key)
        .trim_start_matches('/')
        .to_string()
}

fn sanitize_key(state: &AppState, key: &str) -> Result<String, S3Error> {
    path_codec::sanitize(key, state.config.max_key_length, state.config.max_filename_length).map_err(
        |e| match e {
            PathError::EmbeddedNul => S3Error::InvalidKey(key.to_string()),
            PathError::SegmentTooLong | PathError::KeyTooLong => S3Error::KeyTooLong(key.to_string()),
        },
    )
}

/// Translates `BsHeaders` into the lowercased header map `put` expects.
fn put_headers(bs: &BsHeaders) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in &bs.user_metadata {
        headers.insert(format!("m-{name}"), value.clone());
    }
    headers.insert("x-durability-level".to_string(), bs.durability_level.to_string());
    if let Some(ct) = &bs.content_type {
        headers.insert("content-type".to_string(), ct.clone());
    }
    if let Some(len) = bs.content_length {
        headers.insert("content-length".to_string(), len.to_string());
    }
    if let Some(md5) = &bs.content_md5 {
        headers.insert("content-md5".to_string(), md5.clone());
    }
    headers
}

fn quoted_etag(content_md5_base64: &str) -> String {
    format!("\"{}\"", metadata_codec::md5_base64_to_etag(content_md5_base64))
}

fn to_io_error(e: axum::Error) -> std::io::Error {
    std::io::Error::other(e)
}

async fn ensure_parent_exists(state: &AppState, bucket: &str, key: &str) -> Result<(), S3Error> {
    let parent = match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => "",
    };
    if parent.is_empty() {
        return Ok(());
    }
    state
        .store
        .mkdirp(&bs_path(bucket, parent))
        .await
        .map_err(|e| match e {
            BsError::Forbidden => S3Error::AllAccessDisabled(bucket.to_string()),
            other => S3Error::InternalError(other.to_string()),
        })
}

async fn put_object_inner(
    state: &Arc<AppState>,
    bucket: &str,
    key: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response, S3Error> {
    let key = sanitize_key(state, key)?;

    match state.store.info(bucket).await {
        Ok(Some(info)) if info.is_directory => {}
        Ok(_) => return Err(S3Error::NoSuchBucket(bucket.to_string())),
        Err(e) => return Err(S3Error::InternalError(e.to_string())),
    }

    ensure_parent_exists(state, bucket, &key).await?;

    let header_map = headers_to_map(headers);
    let bs_headers = metadata_codec::request_headers_to_bs_headers(&header_map, &state.durability_map);
    let opts = PutOptions {
        headers: put_headers(&bs_headers),
    };

    let stream = body
        .into_data_stream()
        .map(|r| r.map_err(to_io_error))
        .boxed();

    let result = state
        .store
        .put(&bs_path(bucket, &key), stream, opts)
        .await
        .map_err(|e| match e {
            BsError::NotFound => S3Error::NoSuchBucket(bucket.to_string()),
            BsError::Forbidden => S3Error::AllAccessDisabled(bucket.to_string()),
            other => S3Error::InternalError(other.to_string()),
        })?;

    let etag = result
        .get("content-md5")
        .map(|md5| quoted_etag(md5))
        .unwrap_or_default();

    Ok((StatusCode::OK, [("ETag", etag)]).into_response())
}

async fn copy_object_inner(
    state: &Arc<AppState>,
    bucket: &str,
    key: &str,
    headers: &HeaderMap,
) -> Result<Response, S3Error> {
    let copy_source = headers
        .get("x-amz-copy-source")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| S3Error::InvalidKey(key.to_string()))?;

    let copy_source = urlencoding::decode(copy_source)
        .map_err(|_| S3Error::InvalidKey(key.to_string()))?;
    let copy_source = copy_source.trim_start_matches('/');

    let (src_bucket, src_key) = copy_source
        .split_once('/')
        .ok_or_else(|| S3Error::InvalidKey(copy_source.to_string()))?;
    let src_key = sanitize_key(state, src_key)?;
    let dst_key = sanitize_key(state, key)?;

    // Source-missing is terminal: return 404 with no further writes.
    let src_info = state
        .store
        .info(&bs_path(src_bucket, &src_key))
        .await
        .map_err(|e| S3Error::InternalError(e.to_string()))?
        .ok_or_else(|| S3Error::NoSuchKey(src_key.clone()))?;

    ensure_parent_exists(state, bucket, &dst_key).await?;

    state
        .store
        .ln(&bs_path(src_bucket, &src_key), &bs_path(bucket, &dst_key))
        .await
        .map_err(|e| match e {
            BsError::NotFound => S3Error::NoSuchKey(src_key.clone()),
            BsError::Forbidden => S3Error::AllAccessDisabled(bucket.to_string()),
            other => S3Error::InternalError(other.to_string()),
        })?;

    let etag_hex = src_info
        .headers
        .get("content-md5")
        .map(|md5| metadata_codec::md5_base64_to_etag(md5))
        .unwrap_or_default();

    let xml = xml::copy_object_result(
        &etag_hex,
        &src_info.last_modified.to_rfc3339(),
        &state.config.s3_version,
    );
    Ok(xml_response(xml, state.config.pretty_print))
}

/// PUT /{bucket}/{key} — dispatches to copy, multipart-part (not
/// implemented), or a plain upload.
#[instrument(skip(state, body))]
pub async fn put_object_or_copy(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(query): Query<ObjectQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, S3Error> {
    if query.acl.is_some() {
        return put_acl(State(state), ValidatedPath { bucket, key }).await;
    }
    if query.part_number.is_some() || query.upload_id.is_some() {
        return Ok(multipart_not_implemented());
    }
    if headers.contains_key("x-amz-copy-source") {
        copy_object_inner(&state, &bucket, &key, &headers).await
    } else {
        put_object_inner(&state, &bucket, &key, &headers, body).await
    }
}

/// GET /{bucket}/{key} — streams the backing-store body straight into the
/// response with no intermediate buffering.
#[instrument(skip(state))]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(query): Query<ObjectQuery>,
) -> Result<Response, S3Error> {
    if query.acl.is_some() {
        return get_acl(State(state)).await;
    }

    match state.store.info(&bucket).await {
        Ok(Some(info)) if info.is_directory => {}
        Ok(_) => return Err(S3Error::NoSuchBucket(bucket)),
        Err(e) => return Err(S3Error::InternalError(e.to_string())),
    }

    let path = bs_path(&bucket, &key);
    let (body, info) = state.store.get(&path).await.map_err(|e| match e {
        BsError::NotFound => S3Error::NoSuchKey(key.clone()),
        other => S3Error::InternalError(other.to_string()),
    })?;

    if info.is_directory
        || info.headers.get("content-type").map(|s| s.as_str())
            == Some(metadata_codec::DIRECTORY_CONTENT_TYPE)
    {
        return Err(S3Error::NoSuchKey(key));
    }

    let s3_headers = metadata_codec::bs_headers_to_response_headers(&info.headers, &state.durability_map);
    let builder = response_headers(&s3_headers, info.size);

    builder
        .body(Body::from_stream(body))
        .map_err(|e| S3Error::InternalError(e.to_string()))
}

/// HEAD /{bucket}/{key}
#[instrument(skip(state))]
pub async fn head_object(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
) -> Result<Response, S3Error> {
    match state.store.info(&bucket).await {
        Ok(Some(info)) if info.is_directory => {}
        Ok(_) => return Err(S3Error::NoSuchBucket(bucket)),
        Err(e) => return Err(S3Error::InternalError(e.to_string())),
    }

    let path = bs_path(&bucket, &key);
    let info = state
        .store
        .info(&path)
        .await
        .map_err(|e| S3Error::InternalError(e.to_string()))?
        .ok_or_else(|| S3Error::NoSuchKey(key.clone()))?;

    if info.is_directory
        || info.headers.get("content-type").map(|s| s.as_str())
            == Some(metadata_codec::DIRECTORY_CONTENT_TYPE)
    {
        return Err(S3Error::NoSuchKey(key));
    }

    let s3_headers = metadata_codec::bs_headers_to_response_headers(&info.headers, &state.durability_map);
    let builder = response_headers(&s3_headers, info.size);
    builder
        .body(Body::empty())
        .map_err(|e| S3Error::InternalError(e.to_string()))
}

fn response_headers(s3_headers: &metadata_codec::S3Headers, size: u64) -> axum::http::response::Builder {
    let mut map = HashMap::new();
    for (name, value) in &s3_headers.user_metadata {
        map.insert(format!("x-amz-meta-{name}"), value.clone());
    }
    map.insert("x-amz-storage-class".to_string(), s3_headers.storage_class.clone());
    if let Some(ct) = &s3_headers.content_type {
        map.insert("content-type".to_string(), ct.clone());
    }
    // Every GET/HEAD response formats this header; itoa::Buffer is
    // stack-allocated and avoids a heap-allocating format! for the common case.
    let content_length = s3_headers.content_length.unwrap_or(size);
    let mut itoa_buf = itoa::Buffer::new();
    map.insert(
        "content-length".to_string(),
        itoa_buf.format(content_length).to_string(),
    );
    if let Some(etag) = &s3_headers.etag {
        map.insert("etag".to_string(), format!("\"{etag}\""));
    }
    apply_headers(Response::builder().status(StatusCode::OK), &map)
}

/// DELETE /{bucket}/{key}
#[instrument(skip(state))]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    ValidatedPath { bucket, key }: ValidatedPath,
    Query(query): Query<ObjectQuery>,
) -> Result<Response, S3Error> {
    if query.upload_id.is_some() {
        return Ok(multipart_not_implemented());
    }

    let path = bs_path(&bucket, &key);
    match state.store.unlink(&path).await {
        Ok(()) => Ok((StatusCode::NO_CONTENT, [("x-amz-delete-marker", "false")]).into_response()),
        Err(BsError::NotFound) => Err(S3Error::NoSuchKey(key)),
        Err(e) => Err(S3Error::InternalError(e.to_string())),
    }
}

/// GET /{bucket}?prefix=…&max-keys=… — the prefix/delimiter listing
/// algorithm. `?uploads` is handled first since it shares this path with
/// ListObjects and has a fixed, unrelated response shape.
#[instrument(skip(state))]
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    ValidatedBucket(bucket): ValidatedBucket,
    Query(query): Query<ListObjectsQuery>,
) -> Result<Response, S3Error> {
    if query.uploads.is_some() {
        return Ok(xml_response(
            xml::list_multipart_uploads_result(&bucket, &state.config.s3_version),
            state.config.pretty_print,
        ));
    }

    if query.prefix.contains("//") {
        let xml = xml::list_bucket_result(ListBucketResultArgs {
            bucket: &bucket,
            prefix: &query.prefix,
            marker: &query.marker,
            max_keys: query.max_keys.unwrap_or(DEFAULT_MAX_KEYS),
            is_truncated: false,
            owner: state.store.user(),
            objects: &[],
            common_prefixes: &[],
            s3_version: &state.config.s3_version,
        });
        return Ok(xml_response(xml, state.config.pretty_print));
    }

    let (subdir, search_prefix) = path_codec::split_prefix(&query.prefix);
    let walk_path = bs_path(&bucket, &subdir);

    let mut stream = state.store.ls(&walk_path);
    let mut objects = Vec::new();
    let mut common_prefixes = Vec::new();
    let mut object_count: u64 = 0;
    let mut is_truncated = false;

    loop {
        match stream.next().await {
            Some(ListEvent::Object { parent_path, name, info }) => {
                let rel_key = path_codec::relativize(&bucket, &parent_path, &name);
                if !search_prefix.is_empty() && !rel_key.starts_with(&search_prefix) {
                    continue;
                }
                let s3_headers =
                    metadata_codec::bs_headers_to_response_headers(&info.headers, &state.durability_map);
                objects.push(ObjectEntry {
                    key: rel_key,
                    last_modified: info.last_modified.to_rfc3339(),
                    size: info.size,
                    storage_class: s3_headers.storage_class,
                });
                object_count += 1;
                if let Some(max) = query.max_keys {
                    if object_count > max {
                        is_truncated = true;
                        drop(stream);
                        break;
                    }
                }
            }
            Some(ListEvent::Directory { parent_path, name, .. }) => {
                let rel_key = path_codec::relativize(&bucket, &parent_path, &name);
                if !search_prefix.is_empty() && !rel_key.starts_with(&search_prefix) {
                    continue;
                }
                common_prefixes.push(rel_key);
                object_count += 1;
                if let Some(max) = query.max_keys {
                    if object_count > max {
                        is_truncated = true;
                        drop(stream);
                        break;
                    }
                }
            }
            Some(ListEvent::End) | None => break,
            Some(ListEvent::Error { status_like_404: true, .. }) => {
                return Err(S3Error::AllAccessDisabled(bucket))
            }
            Some(ListEvent::Error { message, .. }) => return Err(S3Error::InternalError(message)),
        }
    }

    let max_keys_reported = query.max_keys.unwrap_or_else(|| DEFAULT_MAX_KEYS.max(object_count));

    let xml = xml::list_bucket_result(ListBucketResultArgs {
        bucket: &bucket,
        prefix: &query.prefix,
        marker: &query.marker,
        max_keys: max_keys_reported,
        is_truncated,
        owner: state.store.user(),
        objects: &objects,
        common_prefixes: &common_prefixes,
        s3_version: &state.config.s3_version,
    });
    Ok(xml_response(xml, state.config.pretty_print))
}

/// GET /{bucket}/{key}?acl — constant grant of `FULL_CONTROL` to the store user.
#[instrument(skip(state))]
pub async fn get_acl(State(state): State<Arc<AppState>>) -> Result<Response, S3Error> {
    let xml = xml::access_control_policy(state.store.user(), &state.config.s3_version);
    Ok(xml_response(xml, state.config.pretty_print))
}

/// PUT /{bucket}/{key}?acl — no side effect.
#[instrument(skip(_state))]
pub async fn put_acl(
    State(_state): State<Arc<AppState>>,
    ValidatedPath { .. }: ValidatedPath,
) -> Result<Response, S3Error> {
    Ok(StatusCode::OK.into_response())
}

/// Stub for every multipart *mutation* (initiate/upload-part/complete/abort):
/// true multipart upload is out of scope.
pub fn multipart_not_implemented() -> Response {
    S3Error::NotImplemented("Multipart upload is not implemented.".to_string()).into_response()
}
