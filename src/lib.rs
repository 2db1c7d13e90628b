//! Translation engine for an S3-compatible gateway fronting a hierarchical,
//! filesystem-like backing store.

pub mod api;
pub mod backing_store;
pub mod config;
pub mod metadata_codec;
pub mod metrics;
pub mod path_codec;
