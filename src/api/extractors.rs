//! Custom Axum extractors for S3 path validation.
//!
//! Unlike a single-bucket gateway, bucket existence here is not known at
//! extraction time — only syntax is. These extractors validate shape
//! (bucket-name grammar, leading-slash normalization) and leave
//! existence/permission checks to the handler, which has a backing-store
//! handle to ask.

use super::errors::S3Error;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// DNS-style bucket name check: 3-63 chars, lowercase alphanumerics, `.` and
/// `-`, must start and end with an alphanumeric.
pub fn is_valid_bucket_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 63 {
        return false;
    }
    let bytes = name.as_bytes();
    let first_ok = bytes[0].is_ascii_lowercase() || bytes[0].is_ascii_digit();
    let last_ok = {
        let last = bytes[bytes.len() - 1];
        last.is_ascii_lowercase() || last.is_ascii_digit()
    };
    if !first_ok || !last_ok {
        return false;
    }
    name.bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-')
}

#[derive(Debug, Clone)]
pub struct ValidatedBucket(pub String);

impl std::ops::Deref for ValidatedBucket {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ValidatedBucket
where
    S: Send + Sync,
{
    type Rejection = S3Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(bucket): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| S3Error::InvalidBucketName(String::new()))?;

        if !is_valid_bucket_name(&bucket) {
            return Err(S3Error::InvalidBucketName(bucket));
        }

        Ok(ValidatedBucket(bucket))
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedPath {
    pub bucket: String,
    pub key: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ValidatedPath
where
    S: Send + Sync,
{
    type Rejection = S3Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((bucket, key)): Path<(String, String)> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| S3Error::InvalidKey(String::new()))?;

        if !is_valid_bucket_name(&bucket) {
            return Err(S3Error::InvalidBucketName(bucket));
        }

        let key = key.trim_start_matches('/').to_string();

        Ok(ValidatedPath { bucket, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_style_names() {
        assert!(is_valid_bucket_name("my-bucket.01"));
    }

    #[test]
    fn rejects_too_short() {
        assert!(!is_valid_bucket_name("ab"));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(!is_valid_bucket_name("MyBucket"));
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(!is_valid_bucket_name("-bucket"));
    }

    #[test]
    fn rejects_too_long() {
        assert!(!is_valid_bucket_name(&"a".repeat(64)));
    }
}
