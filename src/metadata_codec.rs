//! Pure translation between S3 and backing-store header namespaces.
//!
//! `x-amz-meta-*` <-> `m-*`, storage class <-> durability level, and the
//! base64 Content-MD5 <-> hex ETag conversion all live here as total
//! functions over string maps, independent of any HTTP framework type.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::HashMap;

/// The sentinel content-type the backing store reports for directory markers.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-json-stream; type=directory";

/// Bidirectional, partially-defined mapping between S3 storage classes and
/// backing-store durability levels.
#[derive(Debug, Clone)]
pub struct DurabilityMap {
    class_to_level: HashMap<String, i64>,
    level_to_class: HashMap<i64, String>,
    default_level: i64,
}

impl DurabilityMap {
    /// Builds the map from two independently configured directions, since
    /// the configured mappings are not guaranteed to be exact inverses of
    /// one another.
    pub fn new(
        class_to_level: HashMap<String, i64>,
        level_to_class: HashMap<i64, String>,
        default_level: i64,
    ) -> Self {
        Self {
            class_to_level,
            level_to_class,
            default_level,
        }
    }

    /// Derives both directions from a single class-to-level mapping,
    /// treating it as bijective. Used when only one direction is configured.
    pub fn from_class_to_level(class_to_level: HashMap<String, i64>, default_level: i64) -> Self {
        let mut level_to_class = HashMap::new();
        for (class, level) in &class_to_level {
            level_to_class.entry(*level).or_insert_with(|| class.clone());
        }
        Self::new(class_to_level, level_to_class, default_level)
    }

    /// Unknown classes fall back to the configured default durability.
    pub fn level_for_class(&self, class: &str) -> i64 {
        self.class_to_level
            .get(class)
            .copied()
            .unwrap_or(self.default_level)
    }

    /// Unknown levels report as `STANDARD`.
    pub fn class_for_level(&self, level: i64) -> String {
        self.level_to_class
            .get(&level)
            .cloned()
            .unwrap_or_else(|| "STANDARD".to_string())
    }

    pub fn default_level(&self) -> i64 {
        self.default_level
    }
}

/// Headers as produced by the gateway, ready to hand to the backing store's
/// `put` call.
#[derive(Debug, Clone, Default)]
pub struct BsHeaders {
    pub user_metadata: HashMap<String, String>,
    pub durability_level: i64,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_md5: Option<String>,
}

/// Maps an incoming request's headers into the backing store's namespace.
///
/// `x-amz-meta-X` becomes `m-X` verbatim (case of `X` preserved);
/// `x-amz-storage-class` resolves through `durability_map`, falling back to
/// its configured default when the class is unrecognized or absent.
pub fn request_headers_to_bs_headers(
    headers: &HashMap<String, String>,
    durability_map: &DurabilityMap,
) -> BsHeaders {
    let mut user_metadata = HashMap::new();
    for (name, value) in headers {
        if let Some(rest) = case_insensitive_strip_prefix(name, "x-amz-meta-") {
            user_metadata.insert(rest.to_string(), value.clone());
        }
    }

    let durability_level = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("x-amz-storage-class"))
        .map(|(_, v)| durability_map.level_for_class(v))
        .unwrap_or_else(|| durability_map.default_level());

    let content_type = header_value(headers, "content-type");
    let content_length = header_value(headers, "content-length").and_then(|v| v.parse().ok());
    let content_md5 = header_value(headers, "content-md5");

    BsHeaders {
        user_metadata,
        durability_level,
        content_type,
        content_length,
        content_md5,
    }
}

/// Headers as reported by the backing store, translated back into the
/// S3-facing response namespace.
#[derive(Debug, Clone, Default)]
pub struct S3Headers {
    pub user_metadata: HashMap<String, String>,
    pub storage_class: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
}

/// Inverse of [`request_headers_to_bs_headers`]: `m-X` -> `x-amz-meta-X`,
/// `x-durability-level` -> `x-amz-storage-class`, and an `ETag` derived from
/// `content-md5` when present.
pub fn bs_headers_to_response_headers(
    headers: &HashMap<String, String>,
    durability_map: &DurabilityMap,
) -> S3Headers {
    let mut user_metadata = HashMap::new();
    for (name, value) in headers {
        if let Some(rest) = case_insensitive_strip_prefix(name, "m-") {
            user_metadata.insert(rest.to_string(), value.clone());
        }
    }

    let storage_class = header_value(headers, "x-durability-level")
        .and_then(|v| v.parse::<i64>().ok())
        .map(|level| durability_map.class_for_level(level))
        .unwrap_or_else(|| "STANDARD".to_string());

    let content_type = header_value(headers, "content-type");
    let content_length = header_value(headers, "content-length").and_then(|v| v.parse().ok());
    let etag = header_value(headers, "content-md5").map(|md5| md5_base64_to_etag(&md5));

    S3Headers {
        user_metadata,
        storage_class,
        content_type,
        content_length,
        etag,
    }
}

/// Base64-decodes an MD5 digest and re-encodes it as lowercase hex.
///
/// Round-trip law: `base64_encode(hex_decode(md5_base64_to_etag(s))) == s`.
pub fn md5_base64_to_etag(content_md5_base64: &str) -> String {
    match BASE64.decode(content_md5_base64) {
        Ok(bytes) => hex::encode(bytes),
        Err(_) => String::new(),
    }
}

/// Inverse of [`md5_base64_to_etag`]: hex-decodes and re-encodes as base64.
pub fn etag_to_md5_base64(etag_hex: &str) -> String {
    match hex::decode(etag_hex) {
        Ok(bytes) => BASE64.encode(bytes),
        Err(_) => String::new(),
    }
}

fn header_value(headers: &HashMap<String, String>, name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

fn case_insensitive_strip_prefix<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() >= prefix.len() && value[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&value[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> DurabilityMap {
        let mut class_to_level = HashMap::new();
        class_to_level.insert("STANDARD".to_string(), 2);
        class_to_level.insert("REDUCED_REDUNDANCY".to_string(), 1);
        DurabilityMap::from_class_to_level(class_to_level, 2)
    }

    #[test]
    fn unknown_class_falls_back_to_default() {
        assert_eq!(map().level_for_class("GLACIER"), 2);
    }

    #[test]
    fn known_class_resolves() {
        assert_eq!(map().level_for_class("REDUCED_REDUNDANCY"), 1);
    }

    #[test]
    fn unknown_level_reports_standard() {
        assert_eq!(map().class_for_level(99), "STANDARD");
    }

    #[test]
    fn known_level_resolves() {
        assert_eq!(map().class_for_level(1), "REDUCED_REDUNDANCY");
    }

    #[test]
    fn md5_roundtrip() {
        let original = "XUFAKrxLKna5cZ2REBfFkg==";
        let hex = md5_base64_to_etag(original);
        assert_eq!(hex, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(etag_to_md5_base64(&hex), original);
    }

    #[test]
    fn request_headers_extract_user_metadata_and_durability() {
        let mut headers = HashMap::new();
        headers.insert("x-amz-meta-Author".to_string(), "alice".to_string());
        headers.insert("x-amz-storage-class".to_string(), "REDUCED_REDUNDANCY".to_string());
        let bs = request_headers_to_bs_headers(&headers, &map());
        assert_eq!(bs.user_metadata.get("Author").unwrap(), "alice");
        assert_eq!(bs.durability_level, 1);
    }

    #[test]
    fn response_headers_project_m_prefixed_back() {
        let mut headers = HashMap::new();
        headers.insert("m-Author".to_string(), "alice".to_string());
        headers.insert("x-durability-level".to_string(), "1".to_string());
        headers.insert("content-md5".to_string(), "XUFAKrxLKna5cZ2REBfFkg==".to_string());
        let s3 = bs_headers_to_response_headers(&headers, &map());
        assert_eq!(s3.user_metadata.get("Author").unwrap(), "alice");
        assert_eq!(s3.storage_class, "REDUCED_REDUNDANCY");
        assert_eq!(s3.etag.unwrap(), "5d41402abc4b2a76b9719d911017c592");
    }

    proptest::proptest! {
        /// The §8 law: `md5Base64ToEtag` then re-encoding the hex-decoded
        /// bytes as base64 reproduces the original string, for any 16-byte
        /// MD5 digest.
        #[test]
        fn md5_base64_etag_roundtrips(bytes in proptest::collection::vec(proptest::num::u8::ANY, 16..=16)) {
            let original = BASE64.encode(&bytes);
            let hex = md5_base64_to_etag(&original);
            proptest::prop_assert_eq!(etag_to_md5_base64(&hex), original);
        }
    }
}
