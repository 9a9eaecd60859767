//! Failure taxonomy for the sync pipeline.
//!
//! A fetch fails whole (no partial payloads); a record that cannot be
//! normalized is dropped, not an error; a probe miss falls back to the next
//! candidate. Store failures abort the current job's write only; upserts are
//! idempotent, so the next scheduled run repairs the gap.

use std::path::PathBuf;

use thiserror::Error;

/// Retrieving raw data from a remote provider or a local snapshot file.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("source {url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("source {url} returned an undecodable payload: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no published version in {url}")]
    MissingVersion { url: String },

    #[error("reading local source {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("local source {path} is not valid JSON: {source}")]
    FileDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Catalog store failures, surfaced through the narrow persistence API.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Anything a sync or repair job can fail with.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
