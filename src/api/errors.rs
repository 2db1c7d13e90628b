//! S3 error taxonomy and XML fault rendering.

use crate::backing_store::BsError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

/// Every S3-facing error this gateway can surface, per the enumerated
/// error-handling design: a fixed set of codes, not general passthrough of
/// backing-store failures.
#[derive(Debug, Clone, Error)]
pub enum S3Error {
    #[error("NoSuchBucket: The specified bucket does not exist.")]
    NoSuchBucket(String),

    #[error("NoSuchKey: The specified key does not exist.")]
    NoSuchKey(String),

    #[error("BucketAlreadyExists: The requested bucket name is not available.")]
    BucketAlreadyExists(String),

    #[error("BucketNotEmpty: The bucket you tried to delete is not empty.")]
    BucketNotEmpty(String),

    #[error("InvalidBucketName: The specified bucket is not valid.")]
    InvalidBucketName(String),

    #[error("InvalidKey: The specified key is not valid.")]
    InvalidKey(String),

    #[error("KeyTooLong: Your key is too long.")]
    KeyTooLong(String),

    #[error("AllAccessDisabled: Access to this resource is disabled.")]
    AllAccessDisabled(String),

    #[error("NotImplemented: A header or query parameter you provided requires functionality that is not implemented.")]
    NotImplemented(String),

    #[error("InternalError: We encountered an internal error. Please try again.")]
    InternalError(String),
}

impl S3Error {
    pub fn code(&self) -> &'static str {
        match self {
            S3Error::NoSuchBucket(_) => "NoSuchBucket",
            S3Error::NoSuchKey(_) => "NoSuchKey",
            S3Error::BucketAlreadyExists(_) => "BucketAlreadyExists",
            S3Error::BucketNotEmpty(_) => "BucketNotEmpty",
            S3Error::InvalidBucketName(_) => "InvalidBucketName",
            S3Error::InvalidKey(_) => "InvalidKey",
            S3Error::KeyTooLong(_) => "KeyTooLong",
            S3Error::AllAccessDisabled(_) => "AllAccessDisabled",
            S3Error::NotImplemented(_) => "NotImplemented",
            S3Error::InternalError(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            S3Error::NoSuchBucket(_) | S3Error::NoSuchKey(_) => StatusCode::NOT_FOUND,
            S3Error::BucketAlreadyExists(_) | S3Error::BucketNotEmpty(_) => StatusCode::CONFLICT,
            S3Error::InvalidBucketName(_) | S3Error::InvalidKey(_) | S3Error::KeyTooLong(_) => {
                StatusCode::BAD_REQUEST
            }
            S3Error::AllAccessDisabled(_) => StatusCode::FORBIDDEN,
            S3Error::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            S3Error::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn resource(&self) -> String {
        match self {
            S3Error::NoSuchBucket(r)
            | S3Error::NoSuchKey(r)
            | S3Error::BucketAlreadyExists(r)
            | S3Error::BucketNotEmpty(r)
            | S3Error::InvalidBucketName(r)
            | S3Error::InvalidKey(r)
            | S3Error::KeyTooLong(r)
            | S3Error::AllAccessDisabled(r)
            | S3Error::NotImplemented(r)
            | S3Error::InternalError(r) => r.clone(),
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <Resource>{}</Resource>
    <RequestId>00000000-0000-0000-0000-000000000000</RequestId>
</Error>"#,
            self.code(),
            self,
            self.resource()
        )
    }
}

impl IntoResponse for S3Error {
    /// Logs the resolved S3 error code at `warn` (4xx) or `error` (5xx)
    /// before rendering the `Error` XML body. The request's method and path
    /// aren't available here — `S3Error` carries no request context — but
    /// every handler runs inside the `tracing::Span` `main.rs` builds from
    /// the incoming request (via `TraceLayer::make_span_with`), so these
    /// events are emitted with that span's `method`/`path` fields attached.
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), "request failed");
        } else {
            warn!(code = self.code(), "request rejected");
        }
        let body = self.to_xml();
        (status, [("Content-Type", "application/xml")], body).into_response()
    }
}

/// BS 404s are significant and get translated per call site (bucket HEAD vs.
/// object GET/DELETE); this default conversion is the catch-all used where
/// the call site has no more specific mapping to apply.
impl From<BsError> for S3Error {
    fn from(err: BsError) -> Self {
        match err {
            BsError::NotFound => S3Error::NoSuchKey(String::new()),
            BsError::Forbidden => S3Error::AllAccessDisabled(String::new()),
            other => S3Error::InternalError(other.to_string()),
        }
    }
}
