//! S3 API request handlers, split into submodules by domain:
//! - `object` — GET, HEAD, PUT, DELETE, COPY, ACL, listing
//! - `bucket` — bucket CRUD and listing
//! - `status` — health check and metrics

mod bucket;
mod object;
mod status;

use crate::backing_store::BackingStore;
use crate::config::Config;
use crate::metadata_codec::DurabilityMap;
use crate::metrics::Metrics;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;

pub use bucket::{create_bucket, delete_bucket, head_bucket, list_buckets};
pub use object::{
    delete_object, get_acl, get_object, head_object, list_objects, multipart_not_implemented,
    put_acl, put_object_or_copy, ListObjectsQuery,
};
pub use status::{health_check, metrics_handler};

/// Application state shared across handlers: a store handle, read-only
/// configuration, and the metrics registry. No mutable process-wide state.
pub struct AppState {
    pub store: Arc<dyn BackingStore>,
    pub config: Config,
    pub durability_map: DurabilityMap,
    pub metrics: Arc<Metrics>,
}

fn hval(s: &str) -> HeaderValue {
    HeaderValue::from_bytes(s.as_bytes()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Build an XML response with the correct Content-Type header.
///
/// `pretty` mirrors `Config::pretty_print`: when `false` (the default), the
/// builders' source-readability indentation is collapsed to the compact
/// form S3 itself returns; when `true` it's left as built.
fn xml_response(xml: impl Into<String>, pretty: bool) -> Response {
    let xml = xml.into();
    let body = if pretty { xml } else { crate::api::xml::compact(&xml) };
    (StatusCode::OK, [("Content-Type", "application/xml")], body).into_response()
}

/// Flattens an Axum `HeaderMap` into the lowercased string map the codec and
/// backing-store layers speak, dropping any header whose value is not valid
/// UTF-8.
fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}

/// Renders a translated header map back onto an Axum response, skipping any
/// value that isn't a legal header value.
fn apply_headers(builder: axum::http::response::Builder, headers: &HashMap<String, String>) -> axum::http::response::Builder {
    let mut builder = builder;
    for (name, value) in headers {
        if let Ok(header_name) = axum::http::header::HeaderName::from_bytes(name.as_bytes()) {
            builder = builder.header(header_name, hval(value));
        }
    }
    builder
}
