//! Item sync from Data Dragon: the standard dataset, and the hex-brawl
//! subset kept in its own domain so the two lists never collide.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{CatalogRecord, Domain};
use crate::error::SyncError;
use crate::normalize::{normalize_hex_item, normalize_item};
use crate::sources::{self, cdragon, ddragon, SourceDescriptor};
use crate::store::{CatalogStore, StaleScope};
use crate::writer::{write_batch, WritePlan};

use super::SyncReport;

#[derive(Debug, Clone)]
pub struct ItemSyncOptions {
    pub locale: String,
    pub cache_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for ItemSyncOptions {
    fn default() -> Self {
        Self {
            locale: cdragon::DEFAULT_LOCALE.to_string(),
            cache_file: Some(super::cache_dir().join(Domain::Items.cache_file_name())),
            timeout: sources::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HexItemSyncOptions {
    pub locale: String,
    /// Explicit patch tag; None or "latest" resolves the newest version.
    pub version: Option<String>,
    /// Deactivate hex items missing from the fetched subset.
    pub deactivate_old: bool,
    pub cache_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for HexItemSyncOptions {
    fn default() -> Self {
        Self {
            locale: cdragon::DEFAULT_LOCALE.to_string(),
            version: None,
            deactivate_old: true,
            cache_file: Some(super::cache_dir().join(Domain::HexItems.cache_file_name())),
            timeout: sources::DEFAULT_TIMEOUT,
        }
    }
}

async fn fetch_item_entries(
    locale: &str,
    version: Option<String>,
    timeout: Duration,
) -> Result<(String, Vec<(String, Value)>), SyncError> {
    let client = sources::http_client(timeout)?;
    let fetched = sources::fetch_json(
        &client,
        &SourceDescriptor::Versioned {
            dataset: ddragon::Dataset::Items,
            locale: locale.to_string(),
            version,
        },
        timeout,
    )
    .await?;
    let version = fetched.version.unwrap_or_default();
    let entries = fetched
        .payload
        .get("data")
        .and_then(Value::as_object)
        .map(|data| {
            data.iter()
                .map(|(id, item)| (id.clone(), item.clone()))
                .collect()
        })
        .unwrap_or_default();
    Ok((version, entries))
}

fn normalize_entries<F>(entries: &[(String, Value)], version: &str, f: F) -> Vec<CatalogRecord>
where
    F: Fn(&str, &Value, &str) -> Option<CatalogRecord>,
{
    let mut dropped = 0usize;
    let mut normalized = Vec::with_capacity(entries.len());
    for (id, raw) in entries {
        match f(id, raw, version) {
            Some(record) => normalized.push(record),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "item entries dropped during normalization");
    }
    normalized
}

pub async fn sync_standard_items(
    store: &dyn CatalogStore,
    opts: &ItemSyncOptions,
) -> Result<SyncReport, SyncError> {
    let (version, entries) = fetch_item_entries(&opts.locale, None, opts.timeout).await?;
    let normalized = normalize_entries(&entries, &version, normalize_item);

    let outcome = write_batch(
        store,
        WritePlan {
            domain: Domain::Items,
            records: &normalized,
            scope: None,
            refresh_membership: None,
            cache_file: opts.cache_file.as_deref(),
            version: Some(&version),
        },
    )
    .await?;

    info!(
        version = %version,
        total = outcome.total,
        upserted = outcome.upserted,
        modified = outcome.modified,
        "standard item sync finished"
    );

    Ok(SyncReport {
        version: Some(version),
        total: outcome.total,
        upserted: outcome.upserted,
        modified: outcome.modified,
        disabled: outcome.disabled,
    })
}

pub async fn sync_hex_items(
    store: &dyn CatalogStore,
    opts: &HexItemSyncOptions,
) -> Result<SyncReport, SyncError> {
    let (version, entries) =
        fetch_item_entries(&opts.locale, opts.version.clone(), opts.timeout).await?;
    let normalized = normalize_entries(&entries, &version, normalize_hex_item);

    let scope = opts.deactivate_old.then(|| StaleScope {
        mode: None,
        version: Some(version.clone()),
    });

    let outcome = write_batch(
        store,
        WritePlan {
            domain: Domain::HexItems,
            records: &normalized,
            scope,
            refresh_membership: None,
            cache_file: opts.cache_file.as_deref(),
            version: Some(&version),
        },
    )
    .await?;

    info!(
        version = %version,
        total = outcome.total,
        upserted = outcome.upserted,
        modified = outcome.modified,
        disabled = outcome.disabled,
        "hex item sync finished"
    );

    Ok(SyncReport {
        version: Some(version),
        total: outcome.total,
        upserted: outcome.upserted,
        modified: outcome.modified,
        disabled: outcome.disabled,
    })
}
