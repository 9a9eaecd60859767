//! Arena augment sync.
//!
//! The arena dump covers every augment the mode has ever shipped; a pool
//! allow-list (when configured) narrows it to the set currently live for the
//! target mode before normalization.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::Domain;
use crate::error::SyncError;
use crate::normalize::normalize_augment;
use crate::sources::{self, cdragon, pool, SourceDescriptor};
use crate::store::{CatalogStore, StaleScope};
use crate::util::env::env_opt;
use crate::writer::{write_batch, WritePlan};

use super::SyncReport;

#[derive(Debug, Clone)]
pub struct AugmentSyncOptions {
    /// Membership tag this run maintains.
    pub mode: String,
    /// Override for the arena source URL; default derives from `locale`.
    pub source_url: Option<String>,
    /// Pool allow-list URL; falls back to `AUGMENTS_POOL_URL`.
    pub pool_url: Option<String>,
    pub locale: String,
    /// Patch tag stamped on the batch; None leaves records unversioned.
    pub version: Option<String>,
    pub is_active: bool,
    /// Deactivate in-scope records missing from this batch.
    pub deactivate_old: bool,
    /// Rebuild this run's membership tag from scratch.
    pub refresh_membership: bool,
    pub cache_file: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for AugmentSyncOptions {
    fn default() -> Self {
        Self {
            mode: "hex_brawl".to_string(),
            source_url: None,
            pool_url: None,
            locale: cdragon::DEFAULT_LOCALE.to_string(),
            version: None,
            is_active: true,
            deactivate_old: false,
            refresh_membership: true,
            cache_file: Some(super::cache_dir().join(Domain::Augments.cache_file_name())),
            timeout: sources::DEFAULT_TIMEOUT,
        }
    }
}

/// The arena payload is either a bare list or wrapped under `augments`.
fn augment_list(payload: &Value) -> Vec<Value> {
    payload
        .as_array()
        .or_else(|| payload.get("augments").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

pub async fn sync_augments(
    store: &dyn CatalogStore,
    opts: &AugmentSyncOptions,
) -> Result<SyncReport, SyncError> {
    let mode = opts.mode.trim().to_string();
    let version = opts
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let client = sources::http_client(opts.timeout)?;

    let pool_url = opts
        .pool_url
        .clone()
        .or_else(|| env_opt("AUGMENTS_POOL_URL"));
    let pool = match pool_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Some(pool::fetch_pool(&client, url, opts.timeout).await?),
        None => None,
    };

    let source_url = opts
        .source_url
        .clone()
        .unwrap_or_else(|| cdragon::arena_source_url(&opts.locale));
    let fetched = sources::fetch_json(
        &client,
        &SourceDescriptor::Remote { url: source_url },
        opts.timeout,
    )
    .await?;

    let mut raw_list = augment_list(&fetched.payload);
    if let Some(pool) = pool.as_ref().filter(|p| !p.is_empty()) {
        let before = raw_list.len();
        raw_list.retain(|raw| pool.allows(raw));
        debug!(before, after = raw_list.len(), "pool filter applied");
    }

    let mut dropped = 0usize;
    let mut normalized = Vec::with_capacity(raw_list.len());
    for raw in &raw_list {
        match normalize_augment(raw, &mode) {
            Some(mut record) => {
                record.version = version.clone();
                record.is_active = opts.is_active;
                normalized.push(record);
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "augment entries dropped during normalization");
    }

    let scope = (opts.deactivate_old && version.is_some()).then(|| StaleScope {
        mode: Some(mode.clone()),
        version: version.clone(),
    });

    let outcome = write_batch(
        store,
        WritePlan {
            domain: Domain::Augments,
            records: &normalized,
            scope,
            refresh_membership: opts.refresh_membership.then_some(mode.as_str()),
            cache_file: opts.cache_file.as_deref(),
            version: version.as_deref(),
        },
    )
    .await?;

    info!(
        mode = %mode,
        total = outcome.total,
        upserted = outcome.upserted,
        modified = outcome.modified,
        disabled = outcome.disabled,
        "augment sync finished"
    );

    Ok(SyncReport {
        version,
        total: outcome.total,
        upserted: outcome.upserted,
        modified: outcome.modified,
        disabled: outcome.disabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn augment_list_accepts_both_wrappers() {
        assert_eq!(augment_list(&json!([{"id": 1}])).len(), 1);
        assert_eq!(augment_list(&json!({"augments": [{"id": 1}, {"id": 2}]})).len(), 2);
        assert!(augment_list(&json!({"other": 1})).is_empty());
    }
}
