//! Champion sync from Data Dragon, plus the legacy-data quarantine pass.
//!
//! Old local imports left rows with swapped key/id fields (numeric ids where
//! the English id belongs). Riot's `key` is always a digit string, so rows
//! violating that are disabled rather than letting them duplicate listings.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{CatalogRecord, Domain};
use crate::error::SyncError;
use crate::normalize::normalize_champion;
use crate::sources::{self, cdragon, ddragon, SourceDescriptor};
use crate::store::{CatalogStore, RecordPatch};
use crate::writer::{write_batch, WritePlan};

use super::SyncReport;

#[derive(Debug, Clone)]
pub struct ChampionSyncOptions {
    pub locale: String,
    pub cache_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for ChampionSyncOptions {
    fn default() -> Self {
        Self {
            locale: cdragon::DEFAULT_LOCALE.to_string(),
            cache_file: Some(super::cache_dir().join(Domain::Champions.cache_file_name())),
            timeout: sources::DEFAULT_TIMEOUT,
        }
    }
}

fn is_digit_string(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// A row is quarantined when its numeric key is not numeric, or its English
/// id is. Both shapes come from historic imports, not from Data Dragon.
fn has_swapped_identity(record: &CatalogRecord) -> bool {
    let key = record
        .extra
        .get("riotKey")
        .and_then(Value::as_str)
        .unwrap_or_default();
    !is_digit_string(key) || is_digit_string(&record.stable_id)
}

pub async fn sync_champions(
    store: &dyn CatalogStore,
    opts: &ChampionSyncOptions,
) -> Result<SyncReport, SyncError> {
    let client = sources::http_client(opts.timeout)?;
    let fetched = sources::fetch_json(
        &client,
        &SourceDescriptor::Versioned {
            dataset: ddragon::Dataset::Champions,
            locale: opts.locale.clone(),
            version: None,
        },
        opts.timeout,
    )
    .await?;
    let version = fetched.version.unwrap_or_default();

    let entries: Vec<Value> = fetched
        .payload
        .get("data")
        .and_then(Value::as_object)
        .map(|data| data.values().cloned().collect())
        .unwrap_or_default();

    let mut dropped = 0usize;
    let mut normalized = Vec::with_capacity(entries.len());
    for raw in &entries {
        match normalize_champion(raw, &version) {
            Some(record) => normalized.push(record),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "champion entries dropped during normalization");
    }

    let outcome = write_batch(
        store,
        WritePlan {
            domain: Domain::Champions,
            records: &normalized,
            scope: None,
            refresh_membership: None,
            cache_file: opts.cache_file.as_deref(),
            version: Some(&version),
        },
    )
    .await?;

    // Quarantine rows with swapped identities left by historic imports.
    let mut disabled = outcome.disabled;
    if outcome.total > 0 {
        for record in store.list(Domain::Champions, true).await? {
            if has_swapped_identity(&record) {
                let patch = RecordPatch {
                    is_active: Some(false),
                    ..RecordPatch::default()
                };
                if store
                    .apply_patch(Domain::Champions, &record.stable_id, &patch)
                    .await?
                {
                    disabled += 1;
                }
            }
        }
    }

    info!(
        version = %version,
        total = outcome.total,
        upserted = outcome.upserted,
        modified = outcome.modified,
        disabled,
        "champion sync finished"
    );

    Ok(SyncReport {
        version: Some(version),
        total: outcome.total,
        upserted: outcome.upserted,
        modified: outcome.modified,
        disabled,
    })
}
