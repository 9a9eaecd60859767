//! Batch write-through for one sync run: scoped deactivation first, then the
//! idempotent bulk upsert, then an atomic cache snapshot.
//!
//! Deactivation runs before the upsert so a record present in the batch can
//! never be flipped inactive by its own run: the keep-set spares it, and the
//! upsert that follows (re)activates it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::{CatalogRecord, Domain};
use crate::error::StoreError;
use crate::store::{CatalogStore, StaleScope};
use crate::util::json_cache::{read_first_json, write_json_atomic};

/// One batch write, fully described.
pub struct WritePlan<'a> {
    pub domain: Domain,
    pub records: &'a [CatalogRecord],
    /// Deactivate stale records in this scope before upserting.
    pub scope: Option<StaleScope>,
    /// Clear this membership tag across the domain before upserting, so the
    /// batch rebuilds exactly that tag. Tags outside the run are untouched.
    pub refresh_membership: Option<&'a str>,
    pub cache_file: Option<&'a Path>,
    /// Version stamped on the cache envelope.
    pub version: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub total: usize,
    pub upserted: u64,
    pub modified: u64,
    pub disabled: u64,
}

/// Run one write plan. An empty batch is a no-op: nothing is deactivated,
/// no membership is cleared, no cache file is replaced.
pub async fn write_batch(
    store: &dyn CatalogStore,
    plan: WritePlan<'_>,
) -> Result<WriteOutcome, StoreError> {
    if plan.records.is_empty() {
        return Ok(WriteOutcome::default());
    }

    let keep: HashSet<String> = plan
        .records
        .iter()
        .map(|r| r.stable_id.clone())
        .collect();

    let mut disabled = 0;
    if let Some(scope) = &plan.scope {
        disabled = store.deactivate_stale(plan.domain, scope, &keep).await?;
        if disabled > 0 {
            debug!(
                domain = %plan.domain,
                mode = scope.mode.as_deref().unwrap_or("*"),
                disabled,
                "deactivated stale records"
            );
        }
    }

    if let Some(mode) = plan.refresh_membership {
        let cleared = store.clear_membership(plan.domain, mode).await?;
        debug!(domain = %plan.domain, mode, cleared, "membership tag cleared for rebuild");
    }

    let outcome = store.bulk_upsert(plan.domain, plan.records).await?;

    if let Some(path) = plan.cache_file {
        let snapshot = cache_envelope(plan.domain, plan.version, plan.records);
        // Cache failures (read-only filesystems) degrade the fallback path
        // only; the store write already succeeded.
        if let Err(err) = write_json_atomic(path, &snapshot) {
            warn!(path = %path.display(), error = %err, "cache snapshot failed");
        }
    }

    Ok(WriteOutcome {
        total: plan.records.len(),
        upserted: outcome.upserted,
        modified: outcome.modified,
        disabled,
    })
}

/// Cache file shape: `{version, <entities>: [...]}`.
fn cache_envelope(domain: Domain, version: Option<&str>, records: &[CatalogRecord]) -> Value {
    let mut envelope = Map::new();
    envelope.insert(
        "version".into(),
        version.map(Value::from).unwrap_or(Value::Null),
    );
    envelope.insert(
        domain.cache_entity_key().into(),
        serde_json::to_value(records).unwrap_or(Value::Array(Vec::new())),
    );
    Value::Object(envelope)
}

/// Degraded-mode read: the first parseable cache snapshot among candidates.
/// Returns the envelope version and the record list.
pub fn read_cached_batch(
    domain: Domain,
    candidates: &[PathBuf],
) -> Option<(Option<String>, Vec<CatalogRecord>)> {
    let envelope = read_first_json(candidates)?;
    let version = envelope
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);
    let records = envelope
        .get(domain.cache_entity_key())
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();
    Some((version, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(id: &str, name: &str, mode: &str) -> CatalogRecord {
        let mut r = CatalogRecord::new(id, name);
        r.add_mode(mode);
        r
    }

    #[tokio::test]
    async fn deactivation_never_hits_records_in_the_batch() {
        let store = MemoryStore::new();
        let mut stale = record("old", "Old", "hex_brawl");
        stale.version = Some("v1".into());
        store.seed(Domain::Augments, stale).await;
        let mut survivor = record("keep", "Keep", "hex_brawl");
        survivor.version = Some("v1".into());
        store.seed(Domain::Augments, survivor).await;

        let mut batch = record("keep", "Keep", "hex_brawl");
        batch.version = Some("v2".into());
        let batch = vec![batch];

        let outcome = write_batch(
            &store,
            WritePlan {
                domain: Domain::Augments,
                records: &batch,
                scope: Some(StaleScope {
                    mode: Some("hex_brawl".into()),
                    version: Some("v2".into()),
                }),
                refresh_membership: None,
                cache_file: None,
                version: Some("v2"),
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.disabled, 1);
        let active = store.list(Domain::Augments, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].stable_id, "keep");
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = MemoryStore::new();
        store.seed(Domain::Augments, record("a", "A", "hex_brawl")).await;

        let outcome = write_batch(
            &store,
            WritePlan {
                domain: Domain::Augments,
                records: &[],
                scope: Some(StaleScope::default()),
                refresh_membership: Some("hex_brawl"),
                cache_file: None,
                version: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome, WriteOutcome::default());
        let records = store.list(Domain::Augments, true).await.unwrap();
        assert!(records[0].has_mode("hex_brawl"), "membership must survive");
    }

    #[tokio::test]
    async fn membership_refresh_rebuilds_one_tag_only() {
        let store = MemoryStore::new();
        let mut r = record("a", "A", "arena");
        r.add_mode("hex_brawl");
        store.seed(Domain::Augments, r).await;
        // "a" left out of this run's pool; "b" joins it.
        let batch = vec![record("b", "B", "hex_brawl")];

        write_batch(
            &store,
            WritePlan {
                domain: Domain::Augments,
                records: &batch,
                scope: None,
                refresh_membership: Some("hex_brawl"),
                cache_file: None,
                version: None,
            },
        )
        .await
        .unwrap();

        let records = store.list(Domain::Augments, true).await.unwrap();
        let a = records.iter().find(|r| r.stable_id == "a").unwrap();
        assert_eq!(a.modes, vec!["arena".to_string()]);
        let b = records.iter().find(|r| r.stable_id == "b").unwrap();
        assert!(b.has_mode("hex_brawl"));
    }

    #[tokio::test]
    async fn cache_snapshot_round_trips() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("augments.json");
        let batch = vec![record("7", "Fire Bolt", "hex_brawl")];

        write_batch(
            &store,
            WritePlan {
                domain: Domain::Augments,
                records: &batch,
                scope: None,
                refresh_membership: None,
                cache_file: Some(&cache),
                version: Some("15.1.1"),
            },
        )
        .await
        .unwrap();

        let (version, records) =
            read_cached_batch(Domain::Augments, &[cache]).unwrap();
        assert_eq!(version.as_deref(), Some("15.1.1"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stable_id, "7");
    }
}
