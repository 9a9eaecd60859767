//! Raw catalog retrieval: remote providers and local snapshot files.
//!
//! A fetch either yields the whole payload or fails with a [`FetchError`],
//! never partial data. Falling back to a previously written cache file is the
//! caller's decision, not the fetcher's.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{header, Client};
use serde_json::Value;

use crate::error::FetchError;

pub mod cdragon;
pub mod ddragon;
pub mod pool;

pub const USER_AGENT: &str = "lol-catalog/0.1 (catalog-sync)";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where a raw catalog payload comes from.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    /// Fully-qualified endpoint, fetched as-is.
    Remote { url: String },
    /// Data Dragon dataset that must first be pinned to a published version.
    /// `version: None` (or the literal "latest") resolves via the version
    /// endpoint before the dataset URL is built.
    Versioned {
        dataset: ddragon::Dataset,
        locale: String,
        version: Option<String>,
    },
    /// Pre-fetched local snapshot.
    File { path: PathBuf },
}

/// A fetched payload plus the provider version it was pinned to, if any.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: Value,
    pub version: Option<String>,
}

pub fn http_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)
}

/// GET a JSON document; any non-2xx answer or undecodable body fails.
pub async fn get_json(client: &Client, url: &str, timeout: Duration) -> Result<Value, FetchError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let body = response.bytes().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Resolve a descriptor to its raw payload.
pub async fn fetch_json(
    client: &Client,
    descriptor: &SourceDescriptor,
    timeout: Duration,
) -> Result<Fetched, FetchError> {
    match descriptor {
        SourceDescriptor::Remote { url } => Ok(Fetched {
            payload: get_json(client, url, timeout).await?,
            version: None,
        }),
        SourceDescriptor::Versioned {
            dataset,
            locale,
            version,
        } => {
            let version = match version.as_deref() {
                Some(v) if !v.trim().is_empty() && v.trim() != "latest" => v.trim().to_string(),
                _ => ddragon::latest_version(client, timeout).await?,
            };
            let url = dataset.url(&version, locale);
            Ok(Fetched {
                payload: get_json(client, &url, timeout).await?,
                version: Some(version),
            })
        }
        SourceDescriptor::File { path } => {
            let raw = std::fs::read(path).map_err(|source| FetchError::File {
                path: path.clone(),
                source,
            })?;
            let payload =
                serde_json::from_slice(&raw).map_err(|source| FetchError::FileDecode {
                    path: path.clone(),
                    source,
                })?;
            Ok(Fetched {
                payload,
                version: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_file_descriptor_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augments.json");
        std::fs::write(&path, br#"{"augments": [{"id": 7}]}"#).unwrap();

        let client = http_client(DEFAULT_TIMEOUT).unwrap();
        let fetched = fetch_json(&client, &SourceDescriptor::File { path }, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(fetched.payload["augments"][0]["id"], 7);
        assert!(fetched.version.is_none());
    }

    #[tokio::test]
    async fn missing_local_file_fails_explicitly() {
        let client = http_client(DEFAULT_TIMEOUT).unwrap();
        let descriptor = SourceDescriptor::File {
            path: PathBuf::from("/nonexistent/augments.json"),
        };
        let err = fetch_json(&client, &descriptor, DEFAULT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::File { .. }));
    }
}
