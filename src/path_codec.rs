//! Pure translation between S3 keys and backing-store paths.
//!
//! Nothing in this module touches the filesystem or the network; every
//! function here is a total function over strings (or fails with a
//! validation error) so it can be exhaustively unit- and property-tested
//! without a running store.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("key contains an embedded NUL byte")]
    EmbeddedNul,
    #[error("path segment exceeds the backing store's filename limit")]
    SegmentTooLong,
    #[error("key exceeds the configured maximum path length")]
    KeyTooLong,
}

/// Trims a leading `/`, rejects NUL bytes and oversized segments/paths.
///
/// `max_len` bounds the sanitized key itself (the caller adds the root
/// and bucket before comparing against any whole-path limit).
pub fn sanitize(key: &str, max_len: usize, max_segment_len: usize) -> Result<String, PathError> {
    let trimmed = key.strip_prefix('/').unwrap_or(key);

    if trimmed.contains('\0') {
        return Err(PathError::EmbeddedNul);
    }
    if trimmed.len() > max_len {
        return Err(PathError::KeyTooLong);
    }
    for segment in trimmed.split('/') {
        if segment.len() > max_segment_len {
            return Err(PathError::SegmentTooLong);
        }
    }

    Ok(trimmed.to_string())
}

/// Joins a backing-store root, bucket name, and sanitized key into a full path.
pub fn join_object(root: &str, bucket: &str, key: &str) -> String {
    let root = root.trim_end_matches('/');
    if key.is_empty() {
        format!("{root}/{bucket}")
    } else {
        format!("{root}/{bucket}/{key}")
    }
}

/// Splits a listing prefix into the directory to walk and the tail to filter on.
pub fn split_prefix(prefix: &str) -> (String, String) {
    if prefix.is_empty() {
        return (String::new(), String::new());
    }
    match prefix.rfind('/') {
        None => (String::new(), prefix.to_string()),
        Some(p) => (prefix[..p].to_string(), prefix[p + 1..].to_string()),
    }
}

/// Recovers the key relative to the bucket root from a listing entry's
/// parent path and name, by locating the bucket segment in `parent_path`.
pub fn relativize(bucket: &str, parent_path: &str, name: &str) -> String {
    let marker = format!("/{bucket}");
    match parent_path.rfind(&marker) {
        Some(idx) => {
            let below = &parent_path[idx + marker.len()..];
            let below = below.trim_start_matches('/');
            if below.is_empty() {
                name.to_string()
            } else {
                format!("{below}/{name}")
            }
        }
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_leading_slash() {
        assert_eq!(sanitize("/a/b", 1024, 255).unwrap(), "a/b");
    }

    #[test]
    fn sanitize_rejects_nul() {
        assert_eq!(sanitize("a\0b", 1024, 255), Err(PathError::EmbeddedNul));
    }

    #[test]
    fn sanitize_rejects_long_segment() {
        let long = "x".repeat(300);
        assert_eq!(sanitize(&long, 1024, 255), Err(PathError::SegmentTooLong));
    }

    #[test]
    fn sanitize_rejects_long_key() {
        let long = format!("a/{}", "x".repeat(50));
        assert_eq!(sanitize(&long, 10, 255), Err(PathError::KeyTooLong));
    }

    #[test]
    fn sanitize_boundary_exactly_max_len_succeeds() {
        let key = "x".repeat(10);
        assert!(sanitize(&key, 10, 255).is_ok());
        let key = "x".repeat(11);
        assert_eq!(sanitize(&key, 10, 255), Err(PathError::KeyTooLong));
    }

    #[test]
    fn join_object_concatenates_with_single_slash() {
        assert_eq!(join_object("/data", "b1", "a/b/c"), "/data/b1/a/b/c");
        assert_eq!(join_object("/data/", "b1", "a"), "/data/b1/a");
    }

    #[test]
    fn join_object_empty_key_is_the_bucket_path() {
        assert_eq!(join_object("/data", "b1", ""), "/data/b1");
    }

    #[test]
    fn split_prefix_empty() {
        assert_eq!(split_prefix(""), (String::new(), String::new()));
    }

    #[test]
    fn split_prefix_no_slash() {
        assert_eq!(split_prefix("abc"), (String::new(), "abc".to_string()));
    }

    #[test]
    fn split_prefix_with_slash() {
        assert_eq!(
            split_prefix("a/b/c"),
            ("a/b".to_string(), "c".to_string())
        );
    }

    #[test]
    fn split_prefix_terminal_slash() {
        assert_eq!(split_prefix("a/b/"), ("a/b".to_string(), String::new()));
    }

    #[test]
    fn split_prefix_roundtrips() {
        for prefix in ["", "a", "a/b", "a/b/c", "a/b/", "/", "a//b"] {
            let (subdir, search) = split_prefix(prefix);
            let rejoined = if subdir.is_empty() {
                search.clone()
            } else {
                format!("{subdir}/{search}")
            };
            assert_eq!(rejoined, prefix, "prefix {prefix:?} did not round-trip");
        }
    }

    #[test]
    fn relativize_at_bucket_root() {
        assert_eq!(relativize("b1", "/data/b1", "file.txt"), "file.txt");
    }

    #[test]
    fn relativize_nested() {
        assert_eq!(
            relativize("b1", "/data/b1/a/b", "c"),
            "a/b/c".to_string()
        );
    }

    proptest::proptest! {
        /// The §8 law: rejoining `subdir` and `searchPrefix` reproduces the
        /// original prefix, for any prefix built from path-safe segments.
        #[test]
        fn split_prefix_roundtrips_arbitrary(segments in proptest::collection::vec("[a-zA-Z0-9_.-]{0,12}", 0..6)) {
            let prefix = segments.join("/");
            let (subdir, search) = split_prefix(&prefix);
            let rejoined = if subdir.is_empty() {
                search.clone()
            } else {
                format!("{subdir}/{search}")
            };
            proptest::prop_assert_eq!(rejoined, prefix);
        }

        /// `sanitize` never panics and either returns a key with its leading
        /// slash stripped or a validation error; it never fabricates `/`.
        #[test]
        fn sanitize_never_panics(key in "\\PC{0,64}") {
            let _ = sanitize(&key, 1024, 255);
        }
    }
}
